#![allow(dead_code)]

use log::*;
use order_fulfillment_engine::{
    db_types::{OrderId, Origin, ProductId},
    ofe_api::checkout_objects::{CartItem, CheckoutRequest, PreparedOrder},
    test_utils::{
        prepare_env::{drop_database, new_test_database},
        seed::{seed_catalog, SeedCatalog},
    },
    CheckoutApi,
    SqliteDatabase,
};

pub async fn setup(max_connections: u32) -> (SqliteDatabase, SeedCatalog) {
    let db = new_test_database(max_connections).await;
    let catalog = seed_catalog(&db).await;
    (db, catalog)
}

pub async fn tear_down(db: SqliteDatabase) {
    let url = db.url().to_string();
    db.close().await;
    drop_database(&url).await;
    debug!("🚀️ Removed test database {url}");
}

pub async fn checkout(db: &SqliteDatabase, items: Vec<CartItem>) -> PreparedOrder {
    let api = CheckoutApi::new(db.clone(), Default::default());
    api.prepare_order(CheckoutRequest::new(items), Origin::Web, None).await.expect("Error creating order")
}

/// Two burgers, and a menu with fries and a cola.
pub async fn burger_and_menu(db: &SqliteDatabase, catalog: &SeedCatalog) -> OrderId {
    let items = vec![
        CartItem::new(catalog.burger, 2),
        CartItem::new(catalog.menu, 1)
            .with_slot(catalog.side_slot, catalog.fries)
            .with_slot(catalog.drink_slot, catalog.cola),
    ];
    checkout(db, items).await.order_id
}

pub async fn count_rows(db: &SqliteDatabase, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .expect("Error counting rows")
}

pub async fn ledger_sum(db: &SqliteDatabase, product_id: ProductId) -> i64 {
    sqlx::query_scalar("SELECT COALESCE(SUM(delta), 0) FROM inventory_ledger WHERE product_id = $1")
        .bind(product_id)
        .fetch_one(db.pool())
        .await
        .expect("Error summing ledger")
}
