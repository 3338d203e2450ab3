//! Value types shared by the order fulfillment engine and its HTTP server.
mod cents;
pub mod helpers;
pub mod op;
mod secret;

pub use cents::{Cents, CentsConversionError};
pub use secret::Secret;
