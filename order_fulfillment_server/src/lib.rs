//! # Order fulfillment server
//! The HTTP surface of the order fulfillment engine. It is responsible for:
//! * Taking orders from the web shop and from POS terminals, and their payments.
//! * Receiving payment confirmations from the online payment gateway.
//! * Letting stations hand out paid orders, safely retried with idempotency keys.
//! * Exposing stock levels and the inventory ledger, and recording stock adjustments.
//!
//! A background worker cancels orders that were never paid and cleans up expired idempotency records.
//!
//! ## Configuration
//! The server is configured via environment variables. See [config](config/index.html) for more information.
//!
//! ## Routes
//! The server exposes the following routes:
//! * `/health`: A health check route that returns a 200 OK response.
//! * `/api/...`: Checkout, POS payments, orders, station redemption and inventory. See [routes](routes/index.html).
//! * `/webhook/payment`: Payment gateway callbacks. Deliveries must carry a valid `X-Webhook-Signature`.

pub mod cli;
pub mod config;
pub mod data_objects;
pub mod errors;
pub mod helpers;
pub mod maintenance_worker;
pub mod middleware;
pub mod routes;
pub mod server;

#[cfg(test)]
mod endpoint_tests;
