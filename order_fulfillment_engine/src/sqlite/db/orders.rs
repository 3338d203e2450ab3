use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{QueryBuilder, SqliteConnection};

use crate::{
    db_types::{NewOrder, Order, OrderId, OrderStatusType},
    ofe_api::order_objects::OrderQueryFilter,
    traits::PaymentDetails,
};

/// Inserts a new order in `pending` status. This is not atomic. You can embed this call inside a transaction if you
/// need to ensure atomicity, and pass `&mut *tx` as the connection argument.
pub async fn insert_order(
    order: NewOrder,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Order, sqlx::Error> {
    let order = sqlx::query_as(
        r#"
            INSERT INTO orders (
                status,
                total,
                origin,
                customer_id,
                contact_email,
                payment_attempt_id,
                created_at,
                updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $7)
            RETURNING *;
        "#,
    )
    .bind(OrderStatusType::Pending)
    .bind(order.total)
    .bind(order.origin)
    .bind(order.customer_id)
    .bind(order.contact_email)
    .bind(order.payment_attempt_id)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(order)
}

pub async fn fetch_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("SELECT * FROM orders WHERE id = $1").bind(order_id).fetch_optional(conn).await?;
    Ok(order)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(cid) = query.customer_id {
        where_clause.push("customer_id = ");
        where_clause.push_bind_unseparated(cid);
    }
    if let Some(email) = query.contact_email {
        where_clause.push("contact_email = ");
        where_clause.push_bind_unseparated(email);
    }
    if let Some(attempt) = query.payment_attempt_id {
        where_clause.push("payment_attempt_id = ");
        where_clause.push_bind_unseparated(attempt);
    }
    if let Some(origin) = query.origin {
        where_clause.push("origin = ");
        where_clause.push_bind_unseparated(origin);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("status IN (");
        for (i, status) in statuses.into_iter().enumerate() {
            if i > 0 {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
        }
        where_clause.push_unseparated(")");
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");

    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

/// Moves the order to `to`, but only if it is currently in `from`. Returns `None` if the order does not exist or is in
/// a different state.
pub async fn set_status_if(
    order_id: OrderId,
    from: OrderStatusType,
    to: OrderStatusType,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET status = $1, updated_at = $2 WHERE id = $3 AND status = $4 RETURNING *")
        .bind(to)
        .bind(now)
        .bind(order_id)
        .bind(from)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Bumps `updated_at` on a pending order, returning it. Returns `None` if the order does not exist or is not pending.
pub async fn touch_pending_order(
    order_id: OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let order = sqlx::query_as("UPDATE orders SET updated_at = $1 WHERE id = $2 AND status = 'pending' RETURNING *")
        .bind(now)
        .bind(order_id)
        .fetch_optional(conn)
        .await?;
    Ok(order)
}

/// Writes the non-empty fields of `details` onto the order. If `required_status` is given, the order is only updated
/// when it is in that state.
pub async fn store_payment_details(
    order_id: OrderId,
    details: PaymentDetails,
    required_status: Option<OrderStatusType>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, sqlx::Error> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(now);
    if let Some(method) = details.method {
        builder.push(", payment_method = ").push_bind(method);
    }
    if let Some(email) = details.contact_email {
        builder.push(", contact_email = ").push_bind(email);
    }
    if let Some(v) = details.gateway_session_id {
        builder.push(", gateway_session_id = ").push_bind(v);
    }
    if let Some(v) = details.gateway_transaction_id {
        builder.push(", gateway_transaction_id = ").push_bind(v);
    }
    if let Some(v) = details.cash_received {
        builder.push(", cash_received = ").push_bind(v);
    }
    if let Some(v) = details.cash_change {
        builder.push(", cash_change = ").push_bind(v);
    }
    if let Some(v) = details.card_processor {
        builder.push(", card_processor = ").push_bind(v);
    }
    if let Some(v) = details.card_transaction_id {
        builder.push(", card_transaction_id = ").push_bind(v);
    }
    if let Some(v) = details.card_status {
        builder.push(", card_status = ").push_bind(v);
    }
    builder.push(" WHERE id = ").push_bind(order_id);
    if let Some(status) = required_status {
        builder.push(" AND status = ").push_bind(status);
    }
    builder.push(" RETURNING *");
    trace!("🗃️ Executing query: {}", builder.sql());
    let order = builder.build_query_as::<Order>().fetch_optional(conn).await?;
    Ok(order)
}

/// Deletes an order and, through the cascade, its lines. The schema refuses to delete anything but pending orders.
pub async fn delete_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(order_id).execute(conn).await?;
    Ok(result.rows_affected())
}

pub async fn fetch_pending_orders_before(
    created_before: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, sqlx::Error> {
    let orders = sqlx::query_as(
        "SELECT * FROM orders WHERE status = 'pending' AND created_at < $1 ORDER BY created_at ASC, id ASC",
    )
    .bind(created_before)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// A no-op write on the order row that takes the database write lock and returns the order's current status, or
/// `None` if it does not exist.
pub async fn lock_order(order_id: OrderId, conn: &mut SqliteConnection) -> Result<Option<OrderStatusType>, sqlx::Error> {
    let status: Option<(OrderStatusType,)> =
        sqlx::query_as("UPDATE orders SET updated_at = updated_at WHERE id = $1 RETURNING status")
            .bind(order_id)
            .fetch_optional(conn)
            .await?;
    Ok(status.map(|(s,)| s))
}
