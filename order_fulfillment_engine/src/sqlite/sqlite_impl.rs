//! `SqliteDatabase` is a concrete implementation of an order fulfillment backend.
//!
//! Unsurprisingly, it uses SQLite as the backend and implements all the traits defined in the [`crate::traits`]
//! module.
use std::{collections::HashMap, fmt::Debug};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{migrate::MigrateError, SqlitePool};

use super::db::{catalog, db_url, idempotency, inventory, new_pool, order_lines, orders, redemptions};
use crate::{
    db_types::{
        IdempotencyRecord,
        InventoryLedgerEntry,
        LedgerReason,
        MenuSlot,
        MenuSlotOption,
        NewLedgerEntry,
        Order,
        OrderDraft,
        OrderId,
        OrderLine,
        OrderStatusType,
        Product,
        ProductId,
        StationId,
    },
    ofe_api::{inventory_objects::Pagination, order_objects::OrderQueryFilter, redemption_objects::RedemptionReceipt},
    traits::{
        CatalogError,
        CatalogReader,
        CreatedOrder,
        DiscardedOrder,
        IdempotencyClaim,
        InventoryError,
        InventoryLedger,
        OrderFlowError,
        OrderManagement,
        PaymentDetails,
        RedemptionError,
        RedemptionOutcome,
        RedemptionStore,
        StatusChange,
        TransitionResult,
    },
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl CatalogReader for SqliteDatabase {
    async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let products = catalog::fetch_products(ids, &mut conn).await?;
        Ok(products)
    }

    async fn fetch_slots_for_products(&self, product_ids: &[ProductId]) -> Result<Vec<MenuSlot>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let slots = catalog::fetch_slots_for_products(product_ids, &mut conn).await?;
        Ok(slots)
    }

    async fn fetch_slot_options(&self, slot_ids: &[i64]) -> Result<Vec<MenuSlotOption>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let options = catalog::fetch_slot_options(slot_ids, &mut conn).await?;
        Ok(options)
    }

    async fn fetch_station_product_ids(&self, station_id: StationId) -> Result<Vec<ProductId>, CatalogError> {
        let mut conn = self.pool.acquire().await?;
        let ids = catalog::fetch_station_product_ids(station_id, &mut conn).await?;
        Ok(ids)
    }
}

impl InventoryLedger for SqliteDatabase {
    async fn append(&self, entry: NewLedgerEntry) -> Result<InventoryLedgerEntry, InventoryError> {
        if entry.delta == 0 {
            return Err(InventoryError::ZeroDelta(entry.product_id));
        }
        let mut tx = self.pool.begin().await?;
        let entry = inventory::insert_entry(entry, Utc::now(), &mut tx).await?;
        tx.commit().await?;
        trace!("🗃️ Ledger entry #{} appended: {} {:+} ({})", entry.id, entry.product_id, entry.delta, entry.reason);
        Ok(entry)
    }

    async fn append_many(&self, entries: Vec<NewLedgerEntry>) -> Result<Vec<InventoryLedgerEntry>, InventoryError> {
        if let Some(zero) = entries.iter().find(|e| e.delta == 0) {
            return Err(InventoryError::ZeroDelta(zero.product_id));
        }
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let mut result = Vec::with_capacity(entries.len());
        for entry in entries {
            result.push(inventory::insert_entry(entry, now, &mut tx).await?);
        }
        tx.commit().await?;
        trace!("🗃️ {} ledger entries appended", result.len());
        Ok(result)
    }

    async fn current_stock(&self, product_id: ProductId) -> Result<i64, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let stock = inventory::stock_for_product(product_id, &mut conn).await?;
        Ok(stock)
    }

    async fn current_stock_batch(&self, product_ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let stock = inventory::stock_for_products(product_ids, &mut conn).await?;
        Ok(stock)
    }

    async fn entries_for_product(
        &self,
        product_id: ProductId,
        pagination: Pagination,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryError> {
        let mut conn = self.pool.acquire().await?;
        let entries =
            inventory::entries_for_product(product_id, pagination.offset(), pagination.count(), &mut conn).await?;
        Ok(entries)
    }

    async fn entries_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<InventoryLedgerEntry>, InventoryError> {
        if since > until {
            return Err(InventoryError::QueryError(format!("{since} is after {until}")));
        }
        let mut conn = self.pool.acquire().await?;
        let entries = inventory::entries_between(since, until, &mut conn).await?;
        Ok(entries)
    }
}

fn sale_reservation(line: &OrderLine, actor: &Option<String>) -> NewLedgerEntry {
    NewLedgerEntry::new(line.product_id, -line.quantity, LedgerReason::Sale)
        .for_order(line.order_id)
        .for_line(line.id)
        .with_actor(actor.clone())
}

impl OrderManagement for SqliteDatabase {
    /// The order insert is the first statement, so the transaction holds the write lock from the start.
    async fn create_order(&self, draft: OrderDraft) -> Result<CreatedOrder, OrderFlowError> {
        if draft.items.is_empty() {
            return Err(OrderFlowError::EmptyOrder);
        }
        let now = Utc::now();
        let OrderDraft { order, items, actor, enforce_stock } = draft;
        let mut tx = self.pool.begin().await?;
        let order = orders::insert_order(order, now, &mut tx).await?;
        let mut lines = Vec::new();
        let mut pending = Vec::new();
        for item in items {
            let parent = order_lines::insert_line(order.id, item.line, None, now, &mut tx).await?;
            if parent.line_type.carries_stock() {
                pending.push(sale_reservation(&parent, &actor));
            }
            let parent_id = parent.id;
            lines.push(parent);
            for component in item.components {
                let line = order_lines::insert_line(order.id, component, Some(parent_id), now, &mut tx).await?;
                pending.push(sale_reservation(&line, &actor));
                lines.push(line);
            }
        }
        let mut reservations = Vec::with_capacity(pending.len());
        for entry in pending {
            reservations.push(inventory::insert_entry(entry, now, &mut tx).await?);
        }
        if enforce_stock {
            let mut requested = HashMap::<ProductId, i64>::new();
            for r in &reservations {
                *requested.entry(r.product_id).or_default() -= r.delta;
            }
            let mut ids = requested.keys().copied().collect::<Vec<_>>();
            ids.sort();
            let levels = inventory::stock_for_products(&ids, &mut tx).await?;
            for product_id in ids {
                let level = levels.get(&product_id).copied().unwrap_or_default();
                if level < 0 {
                    let requested = requested.get(&product_id).copied().unwrap_or_default();
                    debug!("🗃️ Order creation rolled back. {product_id} would drop to {level}");
                    return Err(OrderFlowError::InsufficientStock {
                        product_id,
                        requested,
                        available: level + requested,
                    });
                }
            }
        }
        tx.commit().await?;
        debug!(
            "🗃️ Order #{} saved with {} lines and {} reservations",
            order.id.value(),
            lines.len(),
            reservations.len()
        );
        Ok(CreatedOrder { order, lines, reservations })
    }

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let order = orders::fetch_order(order_id, &mut conn).await?;
        Ok(order)
    }

    async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let lines = order_lines::fetch_lines_for_order(order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::search_orders(filter, &mut conn).await?;
        Ok(orders)
    }

    async fn change_order_status(&self, change: StatusChange) -> Result<TransitionResult, OrderFlowError> {
        let now = Utc::now();
        let StatusChange { order_id, from, to, reversal, payment, actor } = change;
        let mut tx = self.pool.begin().await?;
        let mut order = match orders::set_status_if(order_id, from, to, now, &mut tx).await? {
            Some(order) => order,
            None => {
                let current = orders::fetch_order(order_id, &mut tx).await?;
                return match current {
                    None => Err(OrderFlowError::OrderNotFound(order_id)),
                    Some(o) => Err(OrderFlowError::OrderStatusConflict { order_id, expected: from, actual: o.status }),
                };
            },
        };
        if let Some(details) = payment {
            if let Some(updated) = orders::store_payment_details(order_id, details, None, now, &mut tx).await? {
                order = updated;
            }
        }
        let mut reversals = Vec::new();
        if let Some(reason) = reversal {
            for (product_id, quantity) in order_lines::reserved_quantities(order_id, &mut tx).await? {
                let entry = NewLedgerEntry::new(product_id, quantity, reason).for_order(order_id).with_actor(actor.clone());
                reversals.push(inventory::insert_entry(entry, now, &mut tx).await?);
            }
        }
        tx.commit().await?;
        debug!("🗃️ Order #{} moved from {from} to {to}. {} reversal entries", order_id.value(), reversals.len());
        Ok(TransitionResult { order, reversals })
    }

    async fn record_payment_details(
        &self,
        order_id: OrderId,
        details: PaymentDetails,
    ) -> Result<Order, OrderFlowError> {
        let mut tx = self.pool.begin().await?;
        let updated =
            orders::store_payment_details(order_id, details, Some(OrderStatusType::Pending), Utc::now(), &mut tx)
                .await?;
        let result = match updated {
            Some(order) => Ok(order),
            None => match orders::fetch_order(order_id, &mut tx).await? {
                Some(_) => Err(OrderFlowError::OrderNotPending(order_id)),
                None => Err(OrderFlowError::OrderNotFound(order_id)),
            },
        };
        tx.commit().await?;
        result
    }

    async fn discard_pending_order(
        &self,
        order_id: OrderId,
        actor: Option<String>,
    ) -> Result<Option<DiscardedOrder>, OrderFlowError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let Some(order) = orders::touch_pending_order(order_id, now, &mut tx).await? else {
            trace!("🗃️ Order #{} is not pending. Nothing to discard", order_id.value());
            return Ok(None);
        };
        let mut releases = Vec::new();
        for (product_id, quantity) in order_lines::reserved_quantities(order_id, &mut tx).await? {
            let entry = NewLedgerEntry::new(product_id, quantity, LedgerReason::Correction)
                .for_order(order_id)
                .with_actor(actor.clone());
            releases.push(inventory::insert_entry(entry, now, &mut tx).await?);
        }
        orders::delete_order(order_id, &mut tx).await?;
        tx.commit().await?;
        debug!("🗃️ Pending order #{} discarded. {} products released", order_id.value(), releases.len());
        Ok(Some(DiscardedOrder { order, releases }))
    }

    async fn fetch_stale_pending_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError> {
        let mut conn = self.pool.acquire().await?;
        let orders = orders::fetch_pending_orders_before(created_before, &mut conn).await?;
        Ok(orders)
    }
}

impl RedemptionStore for SqliteDatabase {
    async fn fetch_idempotency_record(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, RedemptionError> {
        let mut conn = self.pool.acquire().await?;
        let record = idempotency::fetch_live_record(scope, key, Utc::now(), &mut conn).await?;
        Ok(record)
    }

    async fn redeem_for_station(
        &self,
        station_id: StationId,
        order_id: OrderId,
        claim: Option<IdempotencyClaim>,
    ) -> Result<RedemptionOutcome, RedemptionError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;
        let status = orders::lock_order(order_id, &mut tx).await?;
        if let Some(claim) = &claim {
            idempotency::delete_expired_record(&claim.scope, &claim.key, now, &mut tx).await?;
            if let Some(record) = idempotency::fetch_live_record(&claim.scope, &claim.key, now, &mut tx).await? {
                tx.commit().await?;
                debug!("🗃️ Replaying stored response for {} / {}", claim.scope, claim.key);
                return Ok(RedemptionOutcome::Replayed { response: record.response });
            }
        }
        match status {
            None => return Err(RedemptionError::OrderNotFound(order_id)),
            Some(OrderStatusType::Paid) => {},
            Some(status) => return Err(RedemptionError::OrderNotRedeemable { order_id, status }),
        }
        let redemption = redemptions::insert_redemption(station_id, order_id, now, &mut tx).await?;
        let redeemed = redemptions::redeem_station_lines(&redemption, &mut tx).await?;
        if redeemed == 0 {
            redemptions::delete_redemption(redemption.id, &mut tx).await?;
        }
        let lines = redemptions::fetch_station_lines(station_id, order_id, &mut tx).await?;
        let receipt = RedemptionReceipt::new(station_id, order_id, redeemed, &lines, now);
        let response =
            serde_json::to_string(&receipt).map_err(|e| RedemptionError::SerializationError(e.to_string()))?;
        if let Some(claim) = claim {
            let expires_at = now + claim.ttl;
            let stored =
                idempotency::insert_if_absent(&claim.scope, &claim.key, &response, now, expires_at, &mut tx).await?;
            if !stored {
                tx.rollback().await?;
                warn!("🗃️ Lost the race for {} / {}. Returning the winner's response", claim.scope, claim.key);
                let mut conn = self.pool.acquire().await?;
                let winner = idempotency::fetch_live_record(&claim.scope, &claim.key, Utc::now(), &mut conn).await?;
                return winner.map(|r| RedemptionOutcome::Replayed { response: r.response }).ok_or_else(|| {
                    RedemptionError::DatabaseError(format!("Idempotency record for {} vanished", claim.scope))
                });
            }
        }
        tx.commit().await?;
        debug!(
            "🗃️ Station #{} redeemed {redeemed} of {} lines on order #{}",
            station_id.value(),
            receipt.matched,
            order_id.value()
        );
        Ok(RedemptionOutcome::Redeemed { receipt, response })
    }

    async fn fetch_station_lines(
        &self,
        station_id: StationId,
        order_id: OrderId,
    ) -> Result<Vec<OrderLine>, RedemptionError> {
        let mut conn = self.pool.acquire().await?;
        let lines = redemptions::fetch_station_lines(station_id, order_id, &mut conn).await?;
        Ok(lines)
    }

    async fn sweep_expired_idempotency_records(&self, now: DateTime<Utc>) -> Result<u64, RedemptionError> {
        let mut conn = self.pool.acquire().await?;
        let removed = idempotency::sweep_expired(now, &mut conn).await?;
        Ok(removed)
    }
}

impl SqliteDatabase {
    /// Creates a new database API object
    pub async fn new(max_connections: u32) -> Result<Self, sqlx::Error> {
        let url = db_url();
        SqliteDatabase::new_with_url(url.as_str(), max_connections).await
    }

    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        trace!("Creating new database connection pool with url {url}");
        let pool = new_pool(url, max_connections).await?;
        let url = url.to_string();
        Ok(Self { url, pool })
    }

    pub fn url(&self) -> &str {
        self.url.as_str()
    }

    /// Returns a reference to the database connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Brings the schema up to date.
    pub async fn migrate(&self) -> Result<(), MigrateError> {
        sqlx::migrate!("./src/sqlite/migrations").run(&self.pool).await?;
        info!("🗃️ Database migrations are up to date");
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}
