use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::db_types::{LedgerReason, ProductId};

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Pagination {
    pub offset: Option<i64>,
    pub count: Option<i64>,
}

impl Pagination {
    pub fn new(offset: i64, count: i64) -> Self {
        Self { offset: Some(offset), count: Some(count) }
    }

    /// The offset to use, never negative.
    pub fn offset(&self) -> i64 {
        self.offset.unwrap_or(0).max(0)
    }

    /// The page size to use: [`DEFAULT_PAGE_SIZE`] when absent or non-positive, and at most [`MAX_PAGE_SIZE`].
    pub fn count(&self) -> i64 {
        match self.count {
            Some(c) if c > 0 => c.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        }
    }
}

/// A stock level at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockLevel {
    pub product_id: ProductId,
    pub stock: i64,
}

/// An operator-initiated ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StockAdjustment {
    pub delta: i64,
    #[serde(default = "default_adjustment_reason")]
    pub reason: LedgerReason,
}

fn default_adjustment_reason() -> LedgerReason {
    LedgerReason::ManualAdjust
}

/// The window for a ledger query. Both ends are inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerWindow {
    pub since: DateTime<Utc>,
    pub until: DateTime<Utc>,
}
