use thiserror::Error;

use crate::{
    db_types::{Cents, OrderId, OrderStatusType, ProductId},
    traits::{CatalogError, InventoryError, OrderFlowError},
};

#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    #[error("The cart is empty")]
    EmptyCart,
    #[error("Invalid quantity {quantity} for {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),
    #[error("Product {0} is not available")]
    InactiveProduct(ProductId),
    #[error("{0} is not a menu product, so slots cannot be chosen for it")]
    SlotsNotAllowed(ProductId),
    #[error("Slot {slot_id} does not belong to {product_id}")]
    InvalidSlot { product_id: ProductId, slot_id: i64 },
    #[error("Slot {slot_id} was chosen more than once for {product_id}")]
    DuplicateSlot { product_id: ProductId, slot_id: i64 },
    #[error("{option} is not allowed in slot {slot_id}")]
    OptionNotAllowed { slot_id: i64, option: ProductId },
    #[error("The line for {product_id} ({amount}) exceeds the payment limit of {ceiling}")]
    LineCeilingExceeded { product_id: ProductId, amount: Cents, ceiling: Cents },
    #[error("The order total ({total}) exceeds the payment limit of {ceiling}")]
    OrderCeilingExceeded { total: Cents, ceiling: Cents },
    #[error("The order amount is too large to be represented")]
    AmountOverflow,
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),
    #[error("{0}")]
    OrderFlowError(#[from] OrderFlowError),
}

impl CheckoutError {
    /// True for errors caused by the cart contents, as opposed to infrastructure failures.
    pub fn is_validation_error(&self) -> bool {
        !matches!(
            self,
            CheckoutError::CatalogError(_) |
                CheckoutError::OrderFlowError(OrderFlowError::DatabaseError(_)) |
                CheckoutError::OrderFlowError(OrderFlowError::InsufficientStock { .. })
        )
    }
}

#[derive(Debug, Clone, Error)]
pub enum PaymentError {
    #[error("Insufficient payment for {order_id}: {received} received, {total} due")]
    InsufficientPayment { order_id: OrderId, total: Cents, received: Cents },
    #[error("Order {order_id} is {status} and cannot be paid")]
    NotPayable { order_id: OrderId, status: OrderStatusType },
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Invalid payment details: {0}")]
    InvalidDetails(String),
    #[error("{0}")]
    OrderFlowError(#[from] OrderFlowError),
}

#[derive(Debug, Clone, Error)]
pub enum InventoryApiError {
    #[error("{0}")]
    InventoryError(#[from] InventoryError),
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),
    #[error("Catalog error: {0}")]
    CatalogError(#[from] CatalogError),
}
