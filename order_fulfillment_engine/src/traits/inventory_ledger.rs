use std::collections::HashMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{InventoryLedgerEntry, NewLedgerEntry, ProductId},
    ofe_api::inventory_objects::Pagination,
};

/// The append-only inventory log.
///
/// Entries are never updated or deleted. The stock level of a product is, by definition, the sum of the deltas of all
/// its entries, and it may be negative (an oversold product).
#[allow(async_fn_in_trait)]
pub trait InventoryLedger: Clone {
    /// Append a single entry and return it. This is a pure insert; there is no read-modify-write involved.
    async fn append(&self, entry: NewLedgerEntry) -> Result<InventoryLedgerEntry, InventoryError>;

    /// Append several entries in one transaction. Either all of them are stored, or none are.
    async fn append_many(&self, entries: Vec<NewLedgerEntry>) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;

    /// The sum of all deltas for the product. Products without entries have a stock of zero.
    async fn current_stock(&self, product_id: ProductId) -> Result<i64, InventoryError>;

    /// Like [`Self::current_stock`], for many products in one query. Every requested id is present in the result.
    async fn current_stock_batch(&self, product_ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, InventoryError>;

    /// The audit trail for a product, newest first.
    async fn entries_for_product(
        &self,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;

    /// All entries created in the given (inclusive) window, oldest first.
    async fn entries_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;
}

#[derive(Debug, Clone, Error)]
pub enum InventoryError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("A ledger entry must change the stock level. A zero delta was supplied for {0}")]
    ZeroDelta(ProductId),
    #[error("Ledger reason '{0}' is reserved for the order flow")]
    ReservedReason(String),
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for InventoryError {
    fn from(e: sqlx::Error) -> Self {
        InventoryError::DatabaseError(e.to_string())
    }
}
