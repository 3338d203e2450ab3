//! # Order fulfillment engine public API
//!
//! The `ofe_api` module exposes the programmatic API of the engine. The API is modular, so that clients can pick the
//! parts they need.
//!
//! * [`checkout_api`] validates carts against the catalog and turns them into pending orders that reserve stock.
//! * [`order_flow_api`] owns the order state machine, including stock reversal on cancellation and refund, and the
//!   clean-up of abandoned pending orders.
//! * [`payment_api`] confirms payments from the online gateway and from POS terminals (cash and card).
//! * [`inventory_api`] reads stock levels and the ledger, and records operator adjustments.
//! * [`redemption_api`] marks order lines as handed out at a station, with idempotent retries.
//!
//! The other submodules in this module are support types.
//!
//! # API usage
//!
//! Every API is created from a database backend that implements the backend traits the API needs, and (for the APIs
//! that publish events) a set of [`crate::events::EventProducers`].
//!
//! ```rust,ignore
//! use order_fulfillment_engine::{events::EventProducers, InventoryApi, SqliteDatabase};
//! let db = SqliteDatabase::new_with_url("sqlite://data/order_fulfillment.db", 5).await?;
//! let api = InventoryApi::new(db, EventProducers::default());
//! let stock = api.current_stock(ProductId(3)).await?;
//! ```
pub mod checkout_api;
pub mod checkout_objects;
pub mod errors;
pub mod inventory_api;
pub mod inventory_objects;
pub mod order_flow_api;
pub mod order_objects;
pub mod payment_api;
pub mod payment_objects;
pub mod redemption_api;
pub mod redemption_objects;

mod stock_notifier;
