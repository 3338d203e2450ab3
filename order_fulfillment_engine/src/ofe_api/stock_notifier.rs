use log::*;

use crate::{
    db_types::InventoryLedgerEntry,
    events::{net_deltas, EventProducers, EventType, StockChangedEvent},
    traits::InventoryLedger,
};

/// Publishes one [`StockChangedEvent`] per product touched by `entries`. Call this only after the entries have been
/// committed. Failures are logged and otherwise ignored.
pub(crate) async fn notify_stock_changes<B: InventoryLedger>(
    db: &B,
    producers: &EventProducers,
    entries: &[InventoryLedgerEntry],
) {
    if entries.is_empty() || !producers.has_stock_subscribers() {
        return;
    }
    let deltas = net_deltas(entries);
    let ids = deltas.iter().map(|(id, _)| *id).collect::<Vec<_>>();
    let levels = match db.current_stock_batch(&ids).await {
        Ok(levels) => levels,
        Err(e) => {
            error!("📦️ Could not read stock levels for change notifications. {e}");
            return;
        },
    };
    for (product_id, delta) in deltas {
        let new_stock = levels.get(&product_id).copied().unwrap_or_default();
        let event = StockChangedEvent::new(product_id, new_stock, delta);
        producers.publish(EventType::StockChanged(event)).await;
    }
}
