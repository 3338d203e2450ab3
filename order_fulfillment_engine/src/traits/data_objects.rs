use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{
        Cents,
        InventoryLedgerEntry,
        LedgerReason,
        Order,
        OrderId,
        OrderLine,
        OrderStatusType,
        PaymentMethod,
    },
    ofe_api::redemption_objects::RedemptionReceipt,
};

/// The result of creating an order: the order row, every line (parents before their components) and the sale
/// reservations that were appended to the ledger in the same transaction.
#[derive(Debug, Clone)]
pub struct CreatedOrder {
    pub order: Order,
    pub lines: Vec<OrderLine>,
    pub reservations: Vec<InventoryLedgerEntry>,
}

/// A status change request handed to the backend. The backend applies it only if the order is still in the `from`
/// state, so that two racing callers cannot both apply a change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub order_id: OrderId,
    pub from: OrderStatusType,
    pub to: OrderStatusType,
    /// If set, reserved stock for every stock-carrying line is returned with this reason
    pub reversal: Option<LedgerReason>,
    pub payment: Option<PaymentDetails>,
    pub actor: Option<String>,
}

impl StatusChange {
    pub fn new(order_id: OrderId, from: OrderStatusType, to: OrderStatusType) -> Self {
        Self { order_id, from, to, reversal: None, payment: None, actor: None }
    }

    pub fn with_reversal(mut self, reason: LedgerReason) -> Self {
        self.reversal = Some(reason);
        self
    }

    pub fn with_payment(mut self, payment: PaymentDetails) -> Self {
        self.payment = Some(payment);
        self
    }

    pub fn with_actor(mut self, actor: Option<String>) -> Self {
        self.actor = actor;
        self
    }
}

#[derive(Debug, Clone)]
pub struct TransitionResult {
    pub order: Order,
    pub reversals: Vec<InventoryLedgerEntry>,
}

/// Payment metadata stored against an order. Only the fields relevant to the method are set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDetails {
    pub method: Option<PaymentMethod>,
    pub contact_email: Option<String>,
    pub gateway_session_id: Option<String>,
    pub gateway_transaction_id: Option<String>,
    pub cash_received: Option<Cents>,
    pub cash_change: Option<Cents>,
    pub card_processor: Option<String>,
    pub card_transaction_id: Option<String>,
    pub card_status: Option<String>,
}

impl PaymentDetails {
    pub fn gateway(session_id: Option<String>, transaction_id: Option<String>, contact_email: Option<String>) -> Self {
        Self {
            method: Some(PaymentMethod::Gateway),
            gateway_session_id: session_id,
            gateway_transaction_id: transaction_id,
            contact_email: contact_email.filter(|e| !e.trim().is_empty()),
            ..Default::default()
        }
    }

    pub fn cash(received: Cents, change: Cents) -> Self {
        Self {
            method: Some(PaymentMethod::Cash),
            cash_received: Some(received),
            cash_change: Some(change),
            ..Default::default()
        }
    }

    pub fn card(processor: String, transaction_id: Option<String>, status: String) -> Self {
        Self {
            method: Some(PaymentMethod::Card),
            card_processor: Some(processor),
            card_transaction_id: transaction_id,
            card_status: Some(status),
            ..Default::default()
        }
    }

    pub fn manual() -> Self {
        Self { method: Some(PaymentMethod::Manual), ..Default::default() }
    }
}

/// A pending order that was removed, and the ledger entries that released its reservation.
#[derive(Debug, Clone)]
pub struct DiscardedOrder {
    pub order: Order,
    pub releases: Vec<InventoryLedgerEntry>,
}

/// The caller's retry key, bound to a scope, and how long the stored response should be kept.
#[derive(Debug, Clone)]
pub struct IdempotencyClaim {
    pub scope: String,
    pub key: String,
    pub ttl: Duration,
}

#[derive(Debug, Clone)]
pub enum RedemptionOutcome {
    /// The call ran; `response` is the serialized `receipt`.
    Redeemed { receipt: RedemptionReceipt, response: String },
    /// A previous call with the same key already ran. `response` is the stored result, verbatim.
    Replayed { response: String },
}

impl RedemptionOutcome {
    pub fn response(&self) -> &str {
        match self {
            Self::Redeemed { response, .. } => response,
            Self::Replayed { response } => response,
        }
    }

    pub fn is_replay(&self) -> bool {
        matches!(self, Self::Replayed { .. })
    }
}
