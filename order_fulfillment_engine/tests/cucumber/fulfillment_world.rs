use cucumber::World;
use log::*;
use order_fulfillment_engine::{
    db_types::{Cents, OrderId, ProductId, StationId},
    ofe_api::redemption_objects::RedemptionReply,
    test_utils::{
        prepare_env::{create_database, random_db_path, run_migrations},
        seed::{seed_catalog, SeedCatalog},
    },
    SqliteDatabase,
};

#[derive(Default, Debug, World)]
pub struct FulfillmentWorld {
    pub system: Option<FulfillmentSystem>,
    pub last_order: Option<OrderId>,
    pub replies: Vec<RedemptionReply>,
    pub last_change: Option<Cents>,
    pub last_error: Option<String>,
}

#[derive(Debug)]
pub struct FulfillmentSystem {
    pub db_path: String,
    pub db: SqliteDatabase,
    pub catalog: SeedCatalog,
}

impl FulfillmentWorld {
    pub fn db(&self) -> &SqliteDatabase {
        &self.system().db
    }

    pub fn system(&self) -> &FulfillmentSystem {
        self.system.as_ref().expect("System not initialised")
    }

    pub fn last_order(&self) -> OrderId {
        self.last_order.expect("No order has been placed yet")
    }

    pub fn product(&self, name: &str) -> ProductId {
        let c = &self.system().catalog;
        match name.to_lowercase().as_str() {
            "burger" => c.burger,
            "fries" => c.fries,
            "cola" => c.cola,
            "shake" => c.shake,
            "menu" => c.menu,
            "banquet" => c.banquet,
            _ => panic!("Unknown product: {name}"),
        }
    }

    pub fn station(&self, name: &str) -> StationId {
        let c = &self.system().catalog;
        match name.to_lowercase().as_str() {
            "grill" => c.grill,
            "bar" => c.bar,
            _ => panic!("Unknown station: {name}"),
        }
    }
}

impl FulfillmentSystem {
    pub async fn new() -> Self {
        let url = random_db_path();
        create_database(&url).await;
        run_migrations(&url).await;
        let db = SqliteDatabase::new_with_url(&url, 1).await.expect("Error creating connection to database");
        debug!("🚀️ Created database: {url}");
        let catalog = seed_catalog(&db).await;
        Self { db_path: url, db, catalog }
    }
}
