use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;

use super::{errors::InventoryApiError, inventory_objects::Pagination, stock_notifier::notify_stock_changes};
use crate::{
    db_types::{InventoryLedgerEntry, LedgerReason, NewLedgerEntry, ProductId},
    events::EventProducers,
    traits::{CatalogReader, InventoryError, InventoryLedger},
};

/// Read access to stock levels and the ledger, plus operator adjustments.
///
/// Stock is never stored; it is always the sum of a product's ledger entries.
pub struct InventoryApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for InventoryApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InventoryApi")
    }
}

impl<B> InventoryApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> InventoryApi<B>
where B: InventoryLedger + CatalogReader
{
    pub async fn current_stock(&self, product_id: ProductId) -> Result<i64, InventoryApiError> {
        Ok(self.db.current_stock(product_id).await?)
    }

    pub async fn current_stock_batch(
        &self,
        product_ids: &[ProductId],
    ) -> Result<HashMap<ProductId, i64>, InventoryApiError> {
        Ok(self.db.current_stock_batch(product_ids).await?)
    }

    /// The ledger for a product, newest first.
    pub async fn history(
        &self,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryApiError> {
        Ok(self.db.entries_for_product(product_id, pagination).await?)
    }

    pub async fn entries_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryApiError> {
        Ok(self.db.entries_between(since, until).await?)
    }

    /// Records an operator stock movement: an opening balance, a manual adjustment (stock count, breakage, a
    /// delivery) or a correction. The order flow reasons can not be used here.
    pub async fn adjust_stock(
        &self,
        product_id: ProductId,
        delta: i64,
        reason: LedgerReason,
        actor: Option<String>,
    ) -> Result<InventoryLedgerEntry, InventoryApiError> {
        if reason.is_order_flow_reason() {
            return Err(InventoryError::ReservedReason(reason.to_string()).into());
        }
        if delta == 0 {
            return Err(InventoryError::ZeroDelta(product_id).into());
        }
        let known = self.db.fetch_products(&[product_id]).await?;
        if known.is_empty() {
            return Err(InventoryApiError::UnknownProduct(product_id));
        }
        let entry = NewLedgerEntry::new(product_id, delta, reason).with_actor(actor);
        let entry = self.db.append(entry).await?;
        info!(
            "📦️ Stock of {product_id} adjusted by {delta:+} ({reason}) by {}",
            entry.actor.as_deref().unwrap_or("an unknown actor")
        );
        notify_stock_changes(&self.db, &self.producers, std::slice::from_ref(&entry)).await;
        Ok(entry)
    }
}
