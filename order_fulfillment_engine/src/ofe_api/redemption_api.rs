use std::{fmt::Debug, sync::OnceLock};

use chrono::{Duration, Utc};
use log::*;
use ofe_common::Secret;
use regex::Regex;

use super::redemption_objects::{redemption_scope, RedemptionReply};
use crate::{
    db_types::{OrderId, OrderLine, StationId},
    helpers::PickupCode,
    traits::{IdempotencyClaim, RedemptionError, RedemptionStore},
};

pub const DEFAULT_IDEMPOTENCY_TTL_HOURS: i64 = 24;

fn idempotency_key_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_.:-]{1,128}$").ok()).as_ref()
}

/// Checks a client-supplied idempotency key. Blank keys count as "no key".
pub fn normalize_idempotency_key(key: Option<&str>) -> Result<Option<String>, RedemptionError> {
    match key.map(str::trim).filter(|k| !k.is_empty()) {
        None => Ok(None),
        Some(k) if idempotency_key_pattern().is_some_and(|re| re.is_match(k)) => Ok(Some(k.to_string())),
        Some(k) => Err(RedemptionError::InvalidIdempotencyKey(k.chars().take(140).collect())),
    }
}

/// Hands out order lines at stations.
///
/// A station redeems the lines of an order whose products it serves. Retries are made safe with an optional
/// idempotency key: a repeated call with the same key gets the first call's response back, byte for byte, and changes
/// nothing. Without a key, repeating a call is still harmless, since a line can only be redeemed once, but the
/// response reflects the second call (`redeemed = 0`).
#[derive(Clone)]
pub struct RedemptionApi<B> {
    db: B,
    idempotency_ttl: Duration,
}

impl<B> Debug for RedemptionApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RedemptionApi (ttl: {})", self.idempotency_ttl)
    }
}

impl<B> RedemptionApi<B> {
    pub fn new(db: B) -> Self {
        Self { db, idempotency_ttl: Duration::hours(DEFAULT_IDEMPOTENCY_TTL_HOURS) }
    }

    pub fn with_idempotency_ttl(mut self, ttl: Duration) -> Self {
        self.idempotency_ttl = ttl;
        self
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> RedemptionApi<B>
where B: RedemptionStore
{
    pub async fn redeem(
        &self,
        station_id: StationId,
        order_id: OrderId,
        idempotency_key: Option<&str>,
    ) -> Result<RedemptionReply, RedemptionError> {
        let key = normalize_idempotency_key(idempotency_key)?;
        let claim = key.map(|key| IdempotencyClaim {
            scope: redemption_scope(station_id, order_id),
            key,
            ttl: self.idempotency_ttl,
        });
        let outcome = self.db.redeem_for_station(station_id, order_id, claim).await?;
        let replayed = outcome.is_replay();
        if replayed {
            debug!("🎟️ Redemption of order #{} at station #{} replayed", order_id.value(), station_id.value());
        } else {
            info!("🎟️ Order #{} redeemed at station #{}", order_id.value(), station_id.value());
        }
        Ok(RedemptionReply { body: outcome.response().to_string(), replayed })
    }

    /// Like [`Self::redeem`], with the order taken from a signed pickup code.
    pub async fn redeem_with_pickup_code(
        &self,
        station_id: StationId,
        code: &str,
        idempotency_key: Option<&str>,
        secret: &Secret<String>,
        max_age: Duration,
    ) -> Result<RedemptionReply, RedemptionError> {
        let order_id = PickupCode::verify(code, secret, max_age, Utc::now()).map_err(|e| {
            warn!("🎟️ Station #{} presented a bad pickup code. {e}", station_id.value());
            RedemptionError::InvalidPickupCode(e.to_string())
        })?;
        self.redeem(station_id, order_id, idempotency_key).await
    }

    /// The lines of the order that the station serves.
    pub async fn assigned_lines(
        &self,
        station_id: StationId,
        order_id: OrderId,
    ) -> Result<Vec<OrderLine>, RedemptionError> {
        self.db.fetch_station_lines(station_id, order_id).await
    }

    /// Removes idempotency records that have expired. Expired records are already ignored on read; this just keeps
    /// the table small.
    pub async fn sweep_expired(&self) -> Result<u64, RedemptionError> {
        let removed = self.db.sweep_expired_idempotency_records(Utc::now()).await?;
        if removed > 0 {
            debug!("🎟️ {removed} expired idempotency records removed");
        }
        Ok(removed)
    }
}
