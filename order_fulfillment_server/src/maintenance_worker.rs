//! Background housekeeping.
//!
//! Once per interval the worker
//! * cancels pending orders that were never paid, returning their stock (only if a pending-order timeout is set), and
//! * deletes expired idempotency records.
//!
//! A failed run is logged and the next tick tries again.
use std::time::Duration as StdDuration;

use chrono::Duration;
use log::*;
use order_fulfillment_engine::{
    db_types::Order,
    events::EventProducers,
    traits::{InventoryLedger, OrderManagement, RedemptionStore},
    OrderFlowApi,
    RedemptionApi,
    SqliteDatabase,
};
use tokio::task::JoinHandle;

use crate::config::ServerConfig;

#[derive(Debug, Clone, Copy)]
pub struct MaintenanceSchedule {
    pub interval: StdDuration,
    /// `None` leaves unpaid orders alone.
    pub pending_order_timeout: Option<Duration>,
    pub idempotency_ttl: Duration,
}

impl MaintenanceSchedule {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            interval: config.maintenance_interval,
            pending_order_timeout: config.pending_order_timeout,
            idempotency_ttl: config.idempotency_ttl,
        }
    }
}

/// Starts the maintenance worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_maintenance_worker(
    db: SqliteDatabase,
    producers: EventProducers,
    schedule: MaintenanceSchedule,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(schedule.interval);
        let orders_api = OrderFlowApi::new(db.clone(), producers);
        let redemption_api = RedemptionApi::new(db).with_idempotency_ttl(schedule.idempotency_ttl);
        info!("🕰️ Maintenance worker started. Running every {}s", schedule.interval.as_secs());
        loop {
            timer.tick().await;
            run_maintenance(&orders_api, &redemption_api, &schedule).await;
        }
    })
}

/// One pass of the worker. Errors are logged, never returned.
pub async fn run_maintenance<B>(
    orders_api: &OrderFlowApi<B>,
    redemption_api: &RedemptionApi<B>,
    schedule: &MaintenanceSchedule,
) where
    B: OrderManagement + InventoryLedger + RedemptionStore,
{
    trace!("🕰️ Running maintenance job");
    if let Some(timeout) = schedule.pending_order_timeout {
        match orders_api.cancel_stale_pending_orders(timeout).await {
            Ok(cancelled) if cancelled.is_empty() => trace!("🕰️ No stale pending orders"),
            Ok(cancelled) => info!("🕰️ {} stale orders cancelled: {}", cancelled.len(), order_list(&cancelled)),
            Err(e) => error!("🕰️ Error cancelling stale pending orders: {e}"),
        }
    }
    match redemption_api.sweep_expired().await {
        Ok(0) => trace!("🕰️ No expired idempotency records"),
        Ok(n) => debug!("🕰️ {n} expired idempotency records removed"),
        Err(e) => error!("🕰️ Error removing expired idempotency records: {e}"),
    }
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("#{} ({}, {})", o.id.value(), o.origin, o.total))
        .collect::<Vec<String>>()
        .join(", ")
}
