use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{InventoryLedgerEntry, Order, OrderStatusType, ProductId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderPaidEvent {
    pub order: Order,
}

impl OrderPaidEvent {
    pub fn new(order: Order) -> Self {
        Self { order }
    }
}

/// An order was cancelled or refunded, and its stock was returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAnnulledEvent {
    pub order: Order,
    pub status: OrderStatusType,
}

impl OrderAnnulledEvent {
    pub fn new(order: Order) -> Self {
        let status = order.status;
        Self { order, status }
    }
}

/// The stock level of a product changed. Sent after the ledger entries that caused it were committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockChangedEvent {
    pub product_id: ProductId,
    pub new_stock: i64,
    pub delta: i64,
    pub timestamp: DateTime<Utc>,
}

impl StockChangedEvent {
    pub fn new(product_id: ProductId, new_stock: i64, delta: i64) -> Self {
        Self { product_id, new_stock, delta, timestamp: Utc::now() }
    }
}

/// Sums ledger entries into one net delta per product, in product id order.
pub fn net_deltas(entries: &[InventoryLedgerEntry]) -> Vec<(ProductId, i64)> {
    let mut deltas = std::collections::BTreeMap::<ProductId, i64>::new();
    for entry in entries {
        *deltas.entry(entry.product_id).or_default() += entry.delta;
    }
    deltas.into_iter().collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventType {
    OrderPaid(OrderPaidEvent),
    OrderAnnulled(OrderAnnulledEvent),
    StockChanged(StockChangedEvent),
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::db_types::LedgerReason;

    fn entry(id: i64, product: i64, delta: i64) -> InventoryLedgerEntry {
        InventoryLedgerEntry {
            id,
            product_id: ProductId(product),
            delta,
            reason: LedgerReason::Sale,
            order_id: None,
            order_line_id: None,
            actor: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn deltas_are_netted_per_product() {
        let entries = [entry(1, 7, -2), entry(2, 3, -1), entry(3, 7, -1)];
        assert_eq!(net_deltas(&entries), vec![(ProductId(3), -1), (ProductId(7), -3)]);
    }

    #[test]
    fn stock_event_json() {
        let ev = StockChangedEvent::new(ProductId(4), 17, -3);
        let json = serde_json::to_value(ev).unwrap();
        assert_eq!(json["productId"], 4);
        assert_eq!(json["newStock"], 17);
        assert_eq!(json["delta"], -3);
    }
}
