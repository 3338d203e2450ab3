//! SQLite backend for the order fulfillment engine.
//!
//! [`SqliteDatabase`] implements every backend trait. The [`db`] submodule holds the plain SQL functions it is built
//! from.
mod sqlite_impl;

pub mod db;
pub use sqlite_impl::SqliteDatabase;
