//! # SQLite Database methods
//!
//! This module contains "low-level" SQLite database interactions.
//!
//! All these interaction are maintained by simple functions (rather than stateful structs) that accept a
//! `&mut SqliteConnection` argument. Callers can obtain a connection from a pool,
//! or create an atomic transaction as the need arises and call through to the functions without any other changes.
//!
//! SQLite only allows one writer at a time. Every multi-statement transaction in [`super::SqliteDatabase`] therefore
//! opens with a write, so that it takes the write lock up front instead of trying to upgrade a read lock later, which
//! fails with `SQLITE_BUSY` under contention.
use std::env;

use log::info;
use sqlx::{sqlite::SqlitePoolOptions, Error as SqlxError, SqlitePool};

pub mod catalog;
pub mod idempotency;
pub mod inventory;
pub mod order_lines;
pub mod orders;
pub mod redemptions;

const SQLITE_DB_URL: &str = "sqlite://data/order_fulfillment.db";

pub fn db_url() -> String {
    let result = env::var("OFE_DATABASE_URL").unwrap_or_else(|_| {
        info!("OFE_DATABASE_URL is not set. Using the default.");
        SQLITE_DB_URL.to_string()
    });
    info!("Using database URL: {result}");
    result
}

pub async fn new_pool(url: &str, max_connections: u32) -> Result<SqlitePool, SqlxError> {
    let pool = SqlitePoolOptions::new().max_connections(max_connections).connect(url).await?;
    Ok(pool)
}
