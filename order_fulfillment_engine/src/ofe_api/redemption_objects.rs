use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{OrderId, OrderLine, ProductId, StationId};

/// What a station gets back from a redemption call. This is also what is stored, serialized, for idempotent replays,
/// so field order and naming are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionReceipt {
    pub order_id: OrderId,
    pub station_id: StationId,
    /// How many lines of the order this station serves
    pub matched: u64,
    /// How many of those were redeemed by this call
    pub redeemed: u64,
    pub items: Vec<RedeemedItem>,
    /// RFC 3339, UTC, microsecond precision
    pub redeemed_at: String,
}

impl RedemptionReceipt {
    pub fn new(
        station_id: StationId,
        order_id: OrderId,
        redeemed: u64,
        lines: &[OrderLine],
        redeemed_at: DateTime<Utc>,
    ) -> Self {
        let items = lines.iter().map(RedeemedItem::from).collect::<Vec<_>>();
        Self {
            order_id,
            station_id,
            matched: items.len() as u64,
            redeemed,
            items,
            redeemed_at: redeemed_at.to_rfc3339_opts(SecondsFormat::Micros, true),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemedItem {
    pub id: i64,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub title: String,
    pub quantity: i64,
    pub is_redeemed: bool,
    pub parent_item_id: Option<i64>,
    pub menu_slot_id: Option<i64>,
    pub menu_slot_name: Option<String>,
}

impl From<&OrderLine> for RedeemedItem {
    fn from(line: &OrderLine) -> Self {
        Self {
            id: line.id,
            order_id: line.order_id,
            product_id: line.product_id,
            title: line.title.clone(),
            quantity: line.quantity,
            is_redeemed: line.is_redeemed(),
            parent_item_id: line.parent_line_id,
            menu_slot_id: line.menu_slot_id,
            menu_slot_name: line.menu_slot_name.clone(),
        }
    }
}

/// The reply to a redemption request. `body` is the exact JSON to hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedemptionReply {
    pub body: String,
    pub replayed: bool,
}

impl RedemptionReply {
    pub fn receipt(&self) -> Result<RedemptionReceipt, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Builds the idempotency scope for a station and order.
pub fn redemption_scope(station_id: StationId, order_id: OrderId) -> String {
    format!("station:{}:order:{}", station_id.value(), order_id.value())
}
