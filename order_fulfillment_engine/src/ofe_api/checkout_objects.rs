use serde::{Deserialize, Serialize};

use crate::db_types::{Cents, Order, OrderId, OrderLine, OrderStatusType, ProductId};

/// The default payment-method ceiling, per line and per order, in minor units.
pub const DEFAULT_PAYMENT_CEILING: i64 = 500_000;

/// A slot choice for a composite (menu) item: "put `product_id` in slot `slot_id`".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSelection {
    pub slot_id: i64,
    pub product_id: ProductId,
}

impl SlotSelection {
    pub fn new(slot_id: i64, product_id: ProductId) -> Self {
        Self { slot_id, product_id }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: ProductId,
    pub quantity: i64,
    #[serde(default)]
    pub slots: Vec<SlotSelection>,
}

impl CartItem {
    pub fn new(product_id: ProductId, quantity: i64) -> Self {
        Self { product_id, quantity, slots: Vec::new() }
    }

    pub fn with_slot(mut self, slot_id: i64, product_id: ProductId) -> Self {
        self.slots.push(SlotSelection::new(slot_id, product_id));
        self
    }
}

/// A cart submitted for checkout. Prices are never taken from the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CheckoutRequest {
    pub items: Vec<CartItem>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    /// The payment attempt this cart belongs to. Any other pending order from the same attempt is discarded.
    #[serde(default)]
    pub payment_attempt_id: Option<String>,
}

impl CheckoutRequest {
    pub fn new(items: Vec<CartItem>) -> Self {
        Self { items, ..Default::default() }
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

/// Limits applied during order preparation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutPolicy {
    /// Maximum `unit price × quantity` of a single line. `None` disables the check.
    pub line_ceiling: Option<Cents>,
    /// Maximum order total. `None` disables the check.
    pub order_ceiling: Option<Cents>,
    /// Reject carts that would drive any product's stock below zero
    pub enforce_stock: bool,
}

impl Default for CheckoutPolicy {
    fn default() -> Self {
        Self {
            line_ceiling: Some(Cents::from(DEFAULT_PAYMENT_CEILING)),
            order_ceiling: Some(Cents::from(DEFAULT_PAYMENT_CEILING)),
            enforce_stock: false,
        }
    }
}

impl CheckoutPolicy {
    pub fn unlimited() -> Self {
        Self { line_ceiling: None, order_ceiling: None, enforce_stock: false }
    }

    pub fn with_line_ceiling(mut self, ceiling: Option<Cents>) -> Self {
        self.line_ceiling = ceiling;
        self
    }

    pub fn with_order_ceiling(mut self, ceiling: Option<Cents>) -> Self {
        self.order_ceiling = ceiling;
        self
    }

    pub fn with_enforce_stock(mut self, enforce: bool) -> Self {
        self.enforce_stock = enforce;
        self
    }
}

/// The result of a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreparedOrder {
    pub order_id: OrderId,
    pub status: OrderStatusType,
    pub total: Cents,
    pub line_items: Vec<OrderLine>,
    /// Other pending orders of the same payment attempt that were discarded
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub superseded: Vec<OrderId>,
}

impl PreparedOrder {
    pub fn new(order: &Order, line_items: Vec<OrderLine>) -> Self {
        Self { order_id: order.id, status: order.status, total: order.total, line_items, superseded: Vec::new() }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cart_json() {
        let json = r#"{"items": [
            {"product_id": 1, "quantity": 2},
            {"product_id": 10, "quantity": 1, "slots": [{"slot_id": 3, "product_id": 2}]}
        ], "contact_email": "ann@example.com"}"#;
        let req: CheckoutRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.items[0], CartItem::new(ProductId(1), 2));
        assert_eq!(req.items[1], CartItem::new(ProductId(10), 1).with_slot(3, ProductId(2)));
        assert_eq!(req.contact_email.as_deref(), Some("ann@example.com"));
        assert!(req.customer_id.is_none());
    }

    #[test]
    fn client_prices_are_rejected() {
        let json = r#"{"items": [{"product_id": 1, "quantity": 2}], "total": 1}"#;
        assert!(serde_json::from_str::<CheckoutRequest>(json).is_err());
    }

    #[test]
    fn default_policy() {
        let policy = CheckoutPolicy::default();
        assert_eq!(policy.line_ceiling, Some(Cents::from(500_000)));
        assert_eq!(policy.order_ceiling, Some(Cents::from(500_000)));
        assert!(!policy.enforce_stock);
        assert!(CheckoutPolicy::unlimited().order_ceiling.is_none());
    }
}
