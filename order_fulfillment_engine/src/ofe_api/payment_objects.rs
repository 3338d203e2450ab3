use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Order, OrderId};

pub const PAYMENT_SUCCEEDED: &str = "payment.succeeded";
pub const PAYMENT_FAILED: &str = "payment.failed";
pub const CARD_SUCCEEDED: &str = "succeeded";

/// An asynchronous callback from the payment gateway. Signature checks have already happened by the time one of these
/// is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayEvent {
    pub event_type: String,
    /// The order id, as the gateway echoes it back
    pub client_reference: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
}

impl GatewayEvent {
    pub fn new<S: Into<String>, R: Into<String>>(event_type: S, client_reference: R) -> Self {
        Self {
            event_type: event_type.into(),
            client_reference: client_reference.into(),
            transaction_id: None,
            session_id: None,
            contact_email: None,
        }
    }

    pub fn succeeded(order_id: OrderId) -> Self {
        Self::new(PAYMENT_SUCCEEDED, order_id.value().to_string())
    }

    pub fn failed(order_id: OrderId) -> Self {
        Self::new(PAYMENT_FAILED, order_id.value().to_string())
    }

    pub fn with_transaction_id<S: Into<String>>(mut self, tx_id: S) -> Self {
        self.transaction_id = Some(tx_id.into());
        self
    }

    pub fn with_session_id<S: Into<String>>(mut self, session_id: S) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    pub fn with_contact_email<S: Into<String>>(mut self, email: S) -> Self {
        self.contact_email = Some(email.into());
        self
    }
}

/// What a gateway callback did. Every variant is a successful acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "order")]
pub enum GatewayOutcome {
    MarkedPaid(Box<Order>),
    /// A duplicate delivery for an order that is already paid
    AlreadyPaid(OrderId),
    /// The payment failed and the pending order was discarded
    Released(OrderId),
    /// Nothing to do: unknown event type, unknown order, or an order that can no longer be paid
    Ignored,
}

/// A cash payment taken at a POS terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashPayment {
    pub amount_received: Cents,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CashReceipt {
    pub order: Order,
    pub amount_received: Cents,
    pub change: Cents,
}

/// The result reported by a card terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardPayment {
    pub processor: String,
    #[serde(default)]
    pub transaction_id: Option<String>,
    pub status: String,
}

impl CardPayment {
    pub fn new<S: Into<String>>(processor: S, transaction_id: Option<String>, status: S) -> Self {
        Self { processor: processor.into(), transaction_id, status: status.into() }
    }

    pub fn is_success(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case(CARD_SUCCEEDED)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "order")]
pub enum CardOutcome {
    Paid(Box<Order>),
    /// The terminal reported something other than success. The metadata was stored, and the order is still pending.
    NotPaid(Box<Order>),
}

impl CardOutcome {
    pub fn order(&self) -> &Order {
        match self {
            CardOutcome::Paid(o) | CardOutcome::NotPaid(o) => o,
        }
    }
}
