//! Data types that are persisted by the engine, or returned directly from the storage layer.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use log::error;
pub use ofe_common::Cents;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Conversion error: {0}")]
pub struct ConversionError(String);

macro_rules! id_type {
    ($name:ident, $prefix:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Type, Serialize, Deserialize)]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $name {
            type Err = ConversionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let s = s.trim();
                let digits = s.strip_prefix('#').unwrap_or(s);
                digits
                    .parse::<i64>()
                    .ok()
                    .filter(|v| *v > 0)
                    .map(Self)
                    .ok_or_else(|| ConversionError(format!("'{s}' is not a valid {}", $prefix)))
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}#{}", $prefix, self.0)
            }
        }
    };
}

id_type!(OrderId, "order");
id_type!(ProductId, "product");
id_type!(StationId, "station");

//--------------------------------------   OrderStatusType     ---------------------------------------------------------
/// The order state machine states. `Cancelled` and `Refunded` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum OrderStatusType {
    /// Created by checkout. Inventory is reserved but no payment has been confirmed.
    Pending,
    /// Payment was confirmed by the gateway, a POS terminal or an administrator.
    Paid,
    /// The order was called off, before or after payment. Reserved stock was returned.
    Cancelled,
    /// A paid order whose money was returned. Reserved stock was returned.
    Refunded,
}

impl OrderStatusType {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Cancelled | Self::Refunded)
    }

    pub fn all() -> [OrderStatusType; 4] {
        [Self::Pending, Self::Paid, Self::Cancelled, Self::Refunded]
    }
}

impl Display for OrderStatusType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatusType::Pending => write!(f, "pending"),
            OrderStatusType::Paid => write!(f, "paid"),
            OrderStatusType::Cancelled => write!(f, "cancelled"),
            OrderStatusType::Refunded => write!(f, "refunded"),
        }
    }
}

impl FromStr for OrderStatusType {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "paid" => Ok(Self::Paid),
            "cancelled" | "canceled" => Ok(Self::Cancelled),
            "refunded" => Ok(Self::Refunded),
            s => Err(ConversionError(format!("Invalid order status: {s}"))),
        }
    }
}

impl From<String> for OrderStatusType {
    fn from(value: String) -> Self {
        value.parse().unwrap_or_else(|_| {
            error!("Invalid order status: {value}. But this conversion cannot fail. Defaulting to Pending");
            OrderStatusType::Pending
        })
    }
}

//--------------------------------------       Origin          ---------------------------------------------------------
/// Where an order was placed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Web,
    Pos,
    Station,
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Origin::Web => write!(f, "web"),
            Origin::Pos => write!(f, "pos"),
            Origin::Station => write!(f, "station"),
        }
    }
}

impl FromStr for Origin {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "web" | "shop" => Ok(Self::Web),
            "pos" => Ok(Self::Pos),
            "station" => Ok(Self::Station),
            s => Err(ConversionError(format!("Invalid order origin: {s}"))),
        }
    }
}

//--------------------------------------    PaymentMethod      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Asynchronous confirmation from the online payment gateway
    Gateway,
    Cash,
    Card,
    /// Marked as paid by an operator
    Manual,
}

impl Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentMethod::Gateway => write!(f, "gateway"),
            PaymentMethod::Cash => write!(f, "cash"),
            PaymentMethod::Card => write!(f, "card"),
            PaymentMethod::Manual => write!(f, "manual"),
        }
    }
}

//--------------------------------------        Order          ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub status: OrderStatusType,
    /// Sum of the top-level line prices at creation time
    pub total: Cents,
    pub origin: Origin,
    pub customer_id: Option<String>,
    pub contact_email: Option<String>,
    pub payment_attempt_id: Option<String>,
    pub payment_method: Option<PaymentMethod>,
    pub gateway_session_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub cash_received: Option<Cents>,
    pub cash_change: Option<Cents>,
    pub card_processor: Option<String>,
    pub card_transaction_id: Option<String>,
    pub card_status: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

//--------------------------------------       NewOrder        ---------------------------------------------------------
#[derive(Debug, Clone, Default)]
pub struct NewOrder {
    pub total: Cents,
    pub origin: Origin,
    pub customer_id: Option<String>,
    pub contact_email: Option<String>,
    pub payment_attempt_id: Option<String>,
}

impl NewOrder {
    pub fn new(total: Cents, origin: Origin) -> Self {
        Self { total, origin, ..Default::default() }
    }

    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_contact_email<S: Into<String>>(mut self, email: S) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    pub fn with_payment_attempt_id<S: Into<String>>(mut self, attempt_id: S) -> Self {
        self.payment_attempt_id = Some(attempt_id.into());
        self
    }
}

//--------------------------------------      LineType         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum LineType {
    /// A standalone product that carries stock
    Simple,
    /// The parent line of a composite (menu) item. Carries the price, but no stock.
    Bundle,
    /// A product chosen for one of the bundle's slots. Carries stock, but no price.
    Component,
}

impl LineType {
    /// True if the line holds inventory, i.e. it has a ledger reservation and is physically redeemable.
    pub fn carries_stock(&self) -> bool {
        matches!(self, Self::Simple | Self::Component)
    }
}

impl Display for LineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LineType::Simple => write!(f, "simple"),
            LineType::Bundle => write!(f, "bundle"),
            LineType::Component => write!(f, "component"),
        }
    }
}

//--------------------------------------      OrderLine        ---------------------------------------------------------
/// A line item. Title and unit price are snapshots taken at order time. Only the redemption columns ever change.
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: OrderId,
    pub line_type: LineType,
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub parent_line_id: Option<i64>,
    pub menu_slot_id: Option<i64>,
    pub menu_slot_name: Option<String>,
    pub redemption_id: Option<i64>,
    pub redeemed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl OrderLine {
    pub fn is_redeemed(&self) -> bool {
        self.redemption_id.is_some()
    }

    pub fn line_total(&self) -> Cents {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrderLine {
    pub line_type: LineType,
    pub product_id: ProductId,
    pub title: String,
    pub unit_price: Cents,
    pub quantity: i64,
    pub menu_slot_id: Option<i64>,
    pub menu_slot_name: Option<String>,
}

impl NewOrderLine {
    pub fn simple(product: &Product, quantity: i64) -> Self {
        Self {
            line_type: LineType::Simple,
            product_id: product.id,
            title: product.name.clone(),
            unit_price: product.price,
            quantity,
            menu_slot_id: None,
            menu_slot_name: None,
        }
    }

    pub fn bundle(product: &Product, quantity: i64) -> Self {
        Self { line_type: LineType::Bundle, ..Self::simple(product, quantity) }
    }

    /// Component lines are free: the price is carried by the bundle line.
    pub fn component(product: &Product, slot: &MenuSlot, quantity: i64) -> Self {
        Self {
            line_type: LineType::Component,
            product_id: product.id,
            title: product.name.clone(),
            unit_price: Cents::from(0),
            quantity,
            menu_slot_id: Some(slot.id),
            menu_slot_name: Some(slot.name.clone()),
        }
    }
}

/// One cart item as it will be stored: a top-level line plus, for bundles, its component lines. Components are linked
/// to the parent line when they are inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftItem {
    pub line: NewOrderLine,
    pub components: Vec<NewOrderLine>,
}

/// Everything needed to create an order in one transaction.
#[derive(Debug, Clone)]
pub struct OrderDraft {
    pub order: NewOrder,
    pub items: Vec<DraftItem>,
    /// The actor recorded against the reservation entries
    pub actor: Option<String>,
    /// When true, creation fails if any reserved product would end up with negative stock
    pub enforce_stock: bool,
}

impl OrderDraft {
    /// The sale reservations implied by the draft, one per stock-carrying line.
    pub fn reservation_count(&self) -> usize {
        self.items
            .iter()
            .map(|i| usize::from(i.line.line_type.carries_stock()) + i.components.len())
            .sum()
    }
}

//--------------------------------------     LedgerReason      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerReason {
    OpeningBalance,
    Sale,
    Refund,
    Cancellation,
    ManualAdjust,
    Correction,
}

impl LedgerReason {
    /// Reasons that are only ever written by the order flow itself.
    pub fn is_order_flow_reason(&self) -> bool {
        matches!(self, Self::Sale | Self::Refund | Self::Cancellation)
    }
}

impl Display for LedgerReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LedgerReason::OpeningBalance => "opening_balance",
            LedgerReason::Sale => "sale",
            LedgerReason::Refund => "refund",
            LedgerReason::Cancellation => "cancellation",
            LedgerReason::ManualAdjust => "manual_adjust",
            LedgerReason::Correction => "correction",
        };
        f.write_str(s)
    }
}

impl FromStr for LedgerReason {
    type Err = ConversionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "opening_balance" => Ok(Self::OpeningBalance),
            "sale" => Ok(Self::Sale),
            "refund" => Ok(Self::Refund),
            "cancellation" => Ok(Self::Cancellation),
            "manual_adjust" => Ok(Self::ManualAdjust),
            "correction" => Ok(Self::Correction),
            s => Err(ConversionError(format!("Invalid ledger reason: {s}"))),
        }
    }
}

//--------------------------------- InventoryLedgerEntry  ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct InventoryLedgerEntry {
    pub id: i64,
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: LedgerReason,
    pub order_id: Option<OrderId>,
    pub order_line_id: Option<i64>,
    pub actor: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLedgerEntry {
    pub product_id: ProductId,
    pub delta: i64,
    pub reason: LedgerReason,
    pub order_id: Option<OrderId>,
    pub order_line_id: Option<i64>,
    pub actor: Option<String>,
}

impl NewLedgerEntry {
    pub fn new(product_id: ProductId, delta: i64, reason: LedgerReason) -> Self {
        Self { product_id, delta, reason, order_id: None, order_line_id: None, actor: None }
    }

    pub fn for_order(mut self, order_id: OrderId) -> Self {
        self.order_id = Some(order_id);
        self
    }

    pub fn for_line(mut self, line_id: i64) -> Self {
        self.order_line_id = Some(line_id);
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

//--------------------------------------   IdempotencyRecord   ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct IdempotencyRecord {
    pub id: i64,
    pub scope: String,
    pub idempotency_key: String,
    /// The serialized response, exactly as it was first returned
    pub response: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

//--------------------------------------      Redemption       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Redemption {
    pub id: i64,
    pub station_id: StationId,
    pub order_id: OrderId,
    pub redeemed_at: DateTime<Utc>,
}

//--------------------------------------       Catalog         ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Type, Serialize, Deserialize)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ProductType {
    Simple,
    /// A composite (menu) product, configured through slots
    Bundle,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Cents,
    pub is_active: bool,
    pub product_type: ProductType,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MenuSlot {
    pub id: i64,
    /// The bundle product this slot belongs to
    pub product_id: ProductId,
    pub name: String,
    pub sequence: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct MenuSlotOption {
    pub slot_id: i64,
    pub option_product_id: ProductId,
}
