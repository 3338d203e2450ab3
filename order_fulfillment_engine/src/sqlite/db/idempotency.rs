use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::db_types::IdempotencyRecord;

/// Fetches the record for the scope and key if it has not expired yet.
pub async fn fetch_live_record(
    scope: &str,
    key: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<IdempotencyRecord>, sqlx::Error> {
    let record = sqlx::query_as(
        "SELECT * FROM idempotency_records WHERE scope = $1 AND idempotency_key = $2 AND expires_at > $3",
    )
    .bind(scope)
    .bind(key)
    .bind(now)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

/// Deletes the record for the scope and key if it has expired, so that the key can be used again.
pub async fn delete_expired_record(
    scope: &str,
    key: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<u64, sqlx::Error> {
    let result =
        sqlx::query("DELETE FROM idempotency_records WHERE scope = $1 AND idempotency_key = $2 AND expires_at <= $3")
            .bind(scope)
            .bind(key)
            .bind(now)
            .execute(conn)
            .await?;
    Ok(result.rows_affected())
}

/// Stores the response under the scope and key, unless a record already exists. Returns `true` if this call stored
/// it.
pub async fn insert_if_absent(
    scope: &str,
    key: &str,
    response: &str,
    now: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
            INSERT INTO idempotency_records (scope, idempotency_key, response, created_at, expires_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (scope, idempotency_key) DO NOTHING
        "#,
    )
    .bind(scope)
    .bind(key)
    .bind(response)
    .bind(now)
    .bind(expires_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected() == 1)
}

pub async fn sweep_expired(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("DELETE FROM idempotency_records WHERE expires_at <= $1").bind(now).execute(conn).await?;
    Ok(result.rows_affected())
}
