//! A small, fixed catalog for tests.
//!
//! | Product   | Type   | Price | Notes                                   |
//! |-----------|--------|-------|-----------------------------------------|
//! | Burger    | simple | 800   |                                         |
//! | Fries     | simple | 400   |                                         |
//! | Cola      | simple | 300   |                                         |
//! | Shake     | simple | 500   | inactive                                |
//! | Menu      | bundle | 1200  | slots: Side (Fries, Shake), Drink (Cola)|
//! | Banquet   | simple | 2000  |                                         |
//!
//! Stations: Grill serves Burger and Fries; Bar serves Cola and Shake.
//!
//! Every active simple product starts with an opening balance of 50.
use sqlx::SqlitePool;

use crate::{
    db_types::{LedgerReason, NewLedgerEntry, ProductId, ProductType, StationId},
    traits::InventoryLedger,
    SqliteDatabase,
};

pub const OPENING_STOCK: i64 = 50;

#[derive(Debug, Clone, Copy)]
pub struct SeedCatalog {
    pub burger: ProductId,
    pub fries: ProductId,
    pub cola: ProductId,
    pub shake: ProductId,
    pub menu: ProductId,
    pub banquet: ProductId,
    pub side_slot: i64,
    pub drink_slot: i64,
    pub grill: StationId,
    pub bar: StationId,
}

pub async fn seed_catalog(db: &SqliteDatabase) -> SeedCatalog {
    let pool = db.pool();
    let burger = insert_product(pool, "Burger", 800, ProductType::Simple, true).await;
    let fries = insert_product(pool, "Fries", 400, ProductType::Simple, true).await;
    let cola = insert_product(pool, "Cola", 300, ProductType::Simple, true).await;
    let shake = insert_product(pool, "Shake", 500, ProductType::Simple, false).await;
    let menu = insert_product(pool, "Menu", 1200, ProductType::Bundle, true).await;
    let banquet = insert_product(pool, "Banquet", 2000, ProductType::Simple, true).await;
    let side_slot = insert_slot(pool, menu, "Side", 1).await;
    let drink_slot = insert_slot(pool, menu, "Drink", 2).await;
    insert_slot_option(pool, side_slot, fries).await;
    insert_slot_option(pool, side_slot, shake).await;
    insert_slot_option(pool, drink_slot, cola).await;
    let grill = insert_station(pool, "Grill", &[burger, fries]).await;
    let bar = insert_station(pool, "Bar", &[cola, shake]).await;
    for product in [burger, fries, cola, banquet] {
        let entry = NewLedgerEntry::new(product, OPENING_STOCK, LedgerReason::OpeningBalance);
        db.append(entry).await.expect("Error seeding opening balance");
    }
    SeedCatalog { burger, fries, cola, shake, menu, banquet, side_slot, drink_slot, grill, bar }
}

pub async fn insert_product(
    pool: &SqlitePool,
    name: &str,
    price: i64,
    product_type: ProductType,
    is_active: bool,
) -> ProductId {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO products (name, price, product_type, is_active) VALUES ($1, $2, $3, $4) RETURNING id",
    )
    .bind(name)
    .bind(price)
    .bind(product_type)
    .bind(is_active)
    .fetch_one(pool)
    .await
    .expect("Error inserting product");
    ProductId(id)
}

pub async fn insert_slot(pool: &SqlitePool, product_id: ProductId, name: &str, sequence: i64) -> i64 {
    let (id,): (i64,) =
        sqlx::query_as("INSERT INTO menu_slots (product_id, name, sequence) VALUES ($1, $2, $3) RETURNING id")
            .bind(product_id)
            .bind(name)
            .bind(sequence)
            .fetch_one(pool)
            .await
            .expect("Error inserting menu slot");
    id
}

pub async fn insert_slot_option(pool: &SqlitePool, slot_id: i64, product_id: ProductId) {
    sqlx::query("INSERT INTO menu_slot_options (slot_id, option_product_id) VALUES ($1, $2)")
        .bind(slot_id)
        .bind(product_id)
        .execute(pool)
        .await
        .expect("Error inserting slot option");
}

pub async fn insert_station(pool: &SqlitePool, name: &str, products: &[ProductId]) -> StationId {
    let (id,): (i64,) = sqlx::query_as("INSERT INTO stations (name) VALUES ($1) RETURNING id")
        .bind(name)
        .fetch_one(pool)
        .await
        .expect("Error inserting station");
    for product in products {
        sqlx::query("INSERT INTO station_products (station_id, product_id) VALUES ($1, $2)")
            .bind(id)
            .bind(product)
            .execute(pool)
            .await
            .expect("Error assigning product to station");
    }
    StationId(id)
}

pub async fn set_product_price(pool: &SqlitePool, product_id: ProductId, price: i64) {
    sqlx::query("UPDATE products SET price = $1 WHERE id = $2")
        .bind(price)
        .bind(product_id)
        .execute(pool)
        .await
        .expect("Error updating product price");
}
