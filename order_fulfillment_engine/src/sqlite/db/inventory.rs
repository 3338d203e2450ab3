use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, SqliteConnection};

use crate::db_types::{InventoryLedgerEntry, NewLedgerEntry, ProductId};

/// Appends a ledger entry. The table is insert-only; there is no way to change an entry once written.
pub async fn insert_entry(
    entry: NewLedgerEntry,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<InventoryLedgerEntry, sqlx::Error> {
    let entry = sqlx::query_as(
        r#"
            INSERT INTO inventory_ledger (product_id, delta, reason, order_id, order_line_id, actor, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *;
        "#,
    )
    .bind(entry.product_id)
    .bind(entry.delta)
    .bind(entry.reason)
    .bind(entry.order_id)
    .bind(entry.order_line_id)
    .bind(entry.actor)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(entry)
}

pub async fn stock_for_product(product_id: ProductId, conn: &mut SqliteConnection) -> Result<i64, sqlx::Error> {
    let (stock,): (i64,) =
        sqlx::query_as("SELECT COALESCE(SUM(delta), 0) FROM inventory_ledger WHERE product_id = $1")
            .bind(product_id)
            .fetch_one(conn)
            .await?;
    Ok(stock)
}

/// Stock levels for several products in a single aggregate query. Products without entries are reported as zero.
pub async fn stock_for_products(
    product_ids: &[ProductId],
    conn: &mut SqliteConnection,
) -> Result<HashMap<ProductId, i64>, sqlx::Error> {
    let mut result = product_ids.iter().map(|id| (*id, 0)).collect::<HashMap<_, _>>();
    if product_ids.is_empty() {
        return Ok(result);
    }
    let mut builder = QueryBuilder::new("SELECT product_id, SUM(delta) FROM inventory_ledger WHERE product_id IN (");
    let mut ids = builder.separated(", ");
    for id in product_ids {
        ids.push_bind(id.value());
    }
    ids.push_unseparated(") GROUP BY product_id");
    let rows: Vec<(i64, i64)> = builder.build_query_as().fetch_all(conn).await?;
    for (pid, stock) in rows {
        result.insert(ProductId(pid), stock);
    }
    Ok(result)
}

/// Newest first.
pub async fn entries_for_product(
    product_id: ProductId,
    offset: i64,
    count: i64,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryLedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        "SELECT * FROM inventory_ledger WHERE product_id = $1 ORDER BY created_at DESC, id DESC LIMIT $2 OFFSET $3",
    )
    .bind(product_id)
    .bind(count)
    .bind(offset)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

/// Oldest first. Both ends of the window are inclusive.
pub async fn entries_between(
    since: DateTime<Utc>,
    until: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<InventoryLedgerEntry>, sqlx::Error> {
    let entries = sqlx::query_as(
        "SELECT * FROM inventory_ledger WHERE created_at >= $1 AND created_at <= $2 ORDER BY created_at ASC, id ASC",
    )
    .bind(since)
    .bind(until)
    .fetch_all(conn)
    .await?;
    Ok(entries)
}
