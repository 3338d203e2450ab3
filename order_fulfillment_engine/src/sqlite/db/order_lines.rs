use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{NewOrderLine, OrderId, OrderLine, ProductId};

/// Inserts a line. Component lines must pass the id of their bundle line as `parent_line_id`; the schema rejects
/// anything else.
pub async fn insert_line(
    order_id: OrderId,
    line: NewOrderLine,
    parent_line_id: Option<i64>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<OrderLine, sqlx::Error> {
    let line = sqlx::query_as(
        r#"
            INSERT INTO order_lines (
                order_id,
                line_type,
                product_id,
                title,
                unit_price,
                quantity,
                parent_line_id,
                menu_slot_id,
                menu_slot_name,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *;
        "#,
    )
    .bind(order_id)
    .bind(line.line_type)
    .bind(line.product_id)
    .bind(line.title)
    .bind(line.unit_price)
    .bind(line.quantity)
    .bind(parent_line_id)
    .bind(line.menu_slot_id)
    .bind(line.menu_slot_name)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(line)
}

pub async fn fetch_lines_for_order(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as("SELECT * FROM order_lines WHERE order_id = $1 ORDER BY id")
        .bind(order_id)
        .fetch_all(conn)
        .await?;
    Ok(lines)
}

/// The quantity held by the order for each product, summed over its stock-carrying (simple and component) lines and
/// ordered by product id. Bundle lines never appear here.
pub async fn reserved_quantities(
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<(ProductId, i64)>, sqlx::Error> {
    let rows: Vec<(i64, i64)> = sqlx::query_as(
        r#"
            SELECT product_id, SUM(quantity)
            FROM order_lines
            WHERE order_id = $1 AND line_type != 'bundle'
            GROUP BY product_id
            ORDER BY product_id
        "#,
    )
    .bind(order_id)
    .fetch_all(conn)
    .await?;
    Ok(rows.into_iter().map(|(pid, qty)| (ProductId(pid), qty)).collect())
}
