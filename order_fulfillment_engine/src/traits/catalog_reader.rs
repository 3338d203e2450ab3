use thiserror::Error;

use crate::db_types::{MenuSlot, MenuSlotOption, Product, ProductId, StationId};

/// Read-only access to the product catalog.
///
/// All the batch methods silently omit ids that do not exist; it is up to the caller to decide whether a missing
/// entry is an error.
#[allow(async_fn_in_trait)]
pub trait CatalogReader: Clone {
    /// Fetch the products with the given ids, in a single round trip.
    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError>;

    /// Fetch the menu slots belonging to the given (bundle) products, ordered by product and slot sequence.
    async fn fetch_slots_for_products(&self, product_ids: &[ProductId]) -> Result<Vec<MenuSlot>, CatalogError>;

    /// Fetch the allow-lists for the given slots.
    async fn fetch_slot_options(&self, slot_ids: &[i64]) -> Result<Vec<MenuSlotOption>, CatalogError>;

    /// The products that the given station hands out.
    async fn fetch_station_product_ids(&self, station_id: StationId) -> Result<Vec<ProductId>, CatalogError>;
}

#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
}

impl From<sqlx::Error> for CatalogError {
    fn from(e: sqlx::Error) -> Self {
        CatalogError::DatabaseError(e.to_string())
    }
}
