use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{Order, OrderDraft, OrderId, OrderLine, OrderStatusType, ProductId},
    ofe_api::order_objects::OrderQueryFilter,
    traits::data_objects::{CreatedOrder, DiscardedOrder, PaymentDetails, StatusChange, TransitionResult},
};

/// Storage for the order aggregate: orders, their lines, and the ledger side effects that must commit together with
/// them.
///
/// The state machine itself (which transitions are legal, and what they imply) lives in
/// [`crate::OrderFlowApi`]. Backends only guarantee atomicity and the compare-and-set semantics of
/// [`Self::change_order_status`].
#[allow(async_fn_in_trait)]
pub trait OrderManagement: Clone {
    /// Creates the order in `pending` status with all its lines, and appends a `sale` ledger entry of `-quantity` for
    /// every stock-carrying line, in one transaction.
    ///
    /// Component lines are linked to the bundle line of the same draft item.
    ///
    /// If `draft.enforce_stock` is set, the transaction is rolled back with [`OrderFlowError::InsufficientStock`] if any
    /// reserved product ends up below zero.
    async fn create_order(&self, draft: OrderDraft) -> Result<CreatedOrder, OrderFlowError>;

    async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError>;

    /// All lines of the order, in insertion order.
    async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, OrderFlowError>;

    /// Orders matching the filter, oldest first.
    async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;

    /// Moves the order from `change.from` to `change.to` in one transaction:
    /// * the status is only updated if the order is still in `change.from`. Otherwise, the call fails with
    ///   [`OrderFlowError::OrderStatusConflict`] and nothing is written,
    /// * payment details, if given, are stored. A non-empty contact email replaces the existing one,
    /// * if `change.reversal` is set, one ledger entry per product is appended, returning the summed quantity of all
    ///   stock-carrying lines of that product.
    async fn change_order_status(&self, change: StatusChange) -> Result<TransitionResult, OrderFlowError>;

    /// Stores payment metadata on an order that is still pending, without changing its status.
    async fn record_payment_details(&self, order_id: OrderId, details: PaymentDetails)
        -> Result<Order, OrderFlowError>;

    /// Releases the reservation of a pending order (reason `correction`) and deletes it, in one transaction.
    ///
    /// Returns `None` if the order does not exist, or is no longer pending.
    async fn discard_pending_order(
        &self,
        order_id: OrderId,
        actor: Option<String>,
    ) -> Result<Option<DiscardedOrder>, OrderFlowError>;

    /// Pending orders that were created before the cut-off.
    async fn fetch_stale_pending_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;
}

#[derive(Debug, Clone, Error)]
pub enum OrderFlowError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("An order cannot move from {from} to {to}")]
    InvalidTransition { from: OrderStatusType, to: OrderStatusType },
    #[error("Order {order_id} was expected to be {expected}, but it is {actual}")]
    OrderStatusConflict { order_id: OrderId, expected: OrderStatusType, actual: OrderStatusType },
    #[error("Order {0} is no longer pending")]
    OrderNotPending(OrderId),
    #[error("Insufficient stock for {product_id}: requested {requested}, available {available}")]
    InsufficientStock { product_id: ProductId, requested: i64, available: i64 },
    #[error("An order must contain at least one line")]
    EmptyOrder,
    #[error("Invalid query: {0}")]
    QueryError(String),
}

impl From<sqlx::Error> for OrderFlowError {
    fn from(e: sqlx::Error) -> Self {
        OrderFlowError::DatabaseError(e.to_string())
    }
}
