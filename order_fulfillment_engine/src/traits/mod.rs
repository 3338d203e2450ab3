//! # Backend contracts
//!
//! This module defines the behaviour a storage backend must provide in order to drive the order fulfillment engine.
//! The public API structs in [`crate::ofe_api`] are generic over these traits, so that a different store (or a mock, in
//! tests) can be dropped in.
//!
//! * [`CatalogReader`] resolves products, menu slots and slot options, and the product set served by each station.
//!   The engine never writes to the catalog.
//! * [`InventoryLedger`] is the append-only stock log. It is the only place where stock levels are computed.
//! * [`OrderManagement`] owns orders and their lines, including the atomic "create order and reserve stock" and
//!   "change status and reverse stock" units of work.
//! * [`RedemptionStore`] marks lines as handed out at a station and keeps the idempotency records that make retried
//!   redemption calls safe.
mod catalog_reader;
mod data_objects;
mod inventory_ledger;
mod order_management;
mod redemption_store;

pub use catalog_reader::{CatalogError, CatalogReader};
pub use data_objects::{
    CreatedOrder,
    DiscardedOrder,
    IdempotencyClaim,
    PaymentDetails,
    RedemptionOutcome,
    StatusChange,
    TransitionResult,
};
pub use inventory_ledger::{InventoryError, InventoryLedger};
pub use order_management::{OrderFlowError, OrderManagement};
pub use redemption_store::{RedemptionError, RedemptionStore};
