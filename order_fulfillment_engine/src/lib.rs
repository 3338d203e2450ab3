//! Order Fulfillment Engine
//!
//! The core of a point-of-sale and self-checkout food-ordering backend. Web checkouts, POS terminals and redemption
//! stations all create or consume orders against one shared inventory; this crate keeps them consistent.
//!
//! The library is divided into these main sections:
//! 1. Data types ([`mod@db_types`]) and the backend traits ([`mod@traits`]) a storage engine must implement. SQLite is
//!    the supported backend ([`SqliteDatabase`]).
//! 2. The public API ([`mod@ofe_api`]): checkout, the order state machine, payment confirmation, the inventory ledger
//!    and station redemption.
//! 3. Events ([`mod@events`]). Orders being paid or annulled, and stock levels changing, can be observed through
//!    simple async hooks. Events are published after the owning transaction commits, and publishing never fails the
//!    operation.
//!
//! Stock is never stored as a counter. Every change is an entry in an append-only ledger, and the stock of a product
//! is the sum of its entries. Stock is reserved when an order is created and returned when it is cancelled or
//! refunded.
pub mod db_types;
pub mod events;
pub mod helpers;
pub mod ofe_api;
pub mod traits;

#[cfg(feature = "sqlite")]
mod sqlite;

#[cfg(any(feature = "test_utils", test))]
pub mod test_utils;

pub use ofe_api::{
    checkout_api::CheckoutApi,
    errors::{CheckoutError, InventoryApiError, PaymentError},
    inventory_api::InventoryApi,
    order_flow_api::OrderFlowApi,
    payment_api::PaymentApi,
    redemption_api::RedemptionApi,
};
#[cfg(feature = "sqlite")]
pub use sqlite::{db as sqlite_db, SqliteDatabase};
pub use traits::{
    CatalogError,
    CatalogReader,
    InventoryError,
    InventoryLedger,
    OrderFlowError,
    OrderManagement,
    RedemptionError,
    RedemptionStore,
};
