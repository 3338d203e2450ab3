use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::{OrderId, OrderLine, Redemption, StationId};

pub async fn insert_redemption(
    station_id: StationId,
    order_id: OrderId,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Redemption, sqlx::Error> {
    let redemption =
        sqlx::query_as("INSERT INTO redemptions (station_id, order_id, redeemed_at) VALUES ($1, $2, $3) RETURNING *")
            .bind(station_id)
            .bind(order_id)
            .bind(now)
            .fetch_one(conn)
            .await?;
    Ok(redemption)
}

/// Removes a redemption that ended up not redeeming anything.
pub async fn delete_redemption(redemption_id: i64, conn: &mut SqliteConnection) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM redemptions WHERE id = $1").bind(redemption_id).execute(conn).await?;
    Ok(())
}

/// Assigns the redemption to every unredeemed, stock-carrying line of the order whose product is served by the
/// station. Returns the number of lines redeemed.
pub async fn redeem_station_lines(
    redemption: &Redemption,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
            UPDATE order_lines
            SET redemption_id = $1, redeemed_at = $2
            WHERE order_id = $3
              AND line_type != 'bundle'
              AND redemption_id IS NULL
              AND product_id IN (SELECT product_id FROM station_products WHERE station_id = $4)
        "#,
    )
    .bind(redemption.id)
    .bind(redemption.redeemed_at)
    .bind(redemption.order_id)
    .bind(redemption.station_id)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

/// The stock-carrying lines of the order that the station hands out, redeemed or not.
pub async fn fetch_station_lines(
    station_id: StationId,
    order_id: OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<OrderLine>, sqlx::Error> {
    let lines = sqlx::query_as(
        r#"
            SELECT * FROM order_lines
            WHERE order_id = $1
              AND line_type != 'bundle'
              AND product_id IN (SELECT product_id FROM station_products WHERE station_id = $2)
            ORDER BY id
        "#,
    )
    .bind(order_id)
    .bind(station_id)
    .fetch_all(conn)
    .await?;
    Ok(lines)
}
