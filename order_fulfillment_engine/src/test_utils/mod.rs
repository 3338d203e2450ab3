//! Helpers for tests: throw-away databases, and a small seeded catalog.
pub mod prepare_env;
pub mod seed;
