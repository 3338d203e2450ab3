use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{
    db_types::{IdempotencyRecord, OrderId, OrderLine, OrderStatusType, StationId},
    traits::data_objects::{IdempotencyClaim, RedemptionOutcome},
};

/// Storage for station redemptions and their idempotency records.
#[allow(async_fn_in_trait)]
pub trait RedemptionStore: Clone {
    /// Fetches the record for the scope and key, provided it has not expired.
    async fn fetch_idempotency_record(
        &self,
        scope: &str,
        key: &str,
    ) -> Result<Option<IdempotencyRecord>, RedemptionError>;

    /// Redeems every unredeemed, stock-carrying line of the order whose product is served by the station.
    ///
    /// With a claim, this is an "insert if absent" against the claim's scope and key. If a live record already exists
    /// its response is returned untouched and no line is modified. If a concurrent caller stores a record for the same
    /// key first, this call's changes are rolled back and the winner's response is returned.
    ///
    /// Only `paid` orders can be redeemed. The replay check happens before that check.
    async fn redeem_for_station(
        &self,
        station_id: StationId,
        order_id: OrderId,
        claim: Option<IdempotencyClaim>,
    ) -> Result<RedemptionOutcome, RedemptionError>;

    /// The stock-carrying lines of the order whose product is served by the station.
    async fn fetch_station_lines(
        &self,
        station_id: StationId,
        order_id: OrderId,
    ) -> Result<Vec<OrderLine>, RedemptionError>;

    /// Deletes records that expired before `now`, returning how many were removed.
    async fn sweep_expired_idempotency_records(&self, now: DateTime<Utc>) -> Result<u64, RedemptionError>;
}

#[derive(Debug, Clone, Error)]
pub enum RedemptionError {
    #[error("We have an internal database engine (configuration/uptime etc.) : {0}")]
    DatabaseError(String),
    #[error("The requested order {0} does not exist")]
    OrderNotFound(OrderId),
    #[error("Order {order_id} is {status} and cannot be redeemed")]
    OrderNotRedeemable { order_id: OrderId, status: OrderStatusType },
    #[error("Invalid idempotency key: {0}")]
    InvalidIdempotencyKey(String),
    #[error("Invalid pickup code: {0}")]
    InvalidPickupCode(String),
    #[error("Could not serialize the redemption receipt. {0}")]
    SerializationError(String),
}

impl From<sqlx::Error> for RedemptionError {
    fn from(e: sqlx::Error) -> Self {
        RedemptionError::DatabaseError(e.to_string())
    }
}
