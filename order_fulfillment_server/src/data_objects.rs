use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use order_fulfillment_engine::{
    db_types::{OrderId, OrderStatusType, Origin, ProductId},
    ofe_api::order_objects::OrderQueryFilter,
};
use serde::{Deserialize, Serialize};

use crate::errors::ServerError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }

    pub fn failure<S: Display>(message: S) -> Self {
        Self { success: false, message: message.to_string() }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: OrderStatusType,
}

/// The body of a station redemption call. Exactly one of `order_id` and `pickup_code` must be given.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RedeemRequest {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub pickup_code: Option<String>,
    /// Takes precedence over the `Idempotency-Key` header.
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

pub enum RedeemTarget {
    Order(OrderId),
    PickupCode(String),
}

impl RedeemRequest {
    pub fn target(&self) -> Result<RedeemTarget, ServerError> {
        let code = self.pickup_code.as_deref().map(str::trim).filter(|c| !c.is_empty());
        match (self.order_id, code) {
            (Some(id), None) => Ok(RedeemTarget::Order(id)),
            (None, Some(code)) => Ok(RedeemTarget::PickupCode(code.to_string())),
            (Some(_), Some(_)) => {
                Err(ServerError::ValidationError("Supply either an order id or a pickup code, not both".into()))
            },
            (None, None) => Err(ServerError::ValidationError("An order id or a pickup code is required".into())),
        }
    }
}

/// Query parameters for `GET /api/orders`. `status` is a comma-separated list.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderSearchParams {
    pub status: Option<String>,
    pub origin: Option<String>,
    pub customer_id: Option<String>,
    pub contact_email: Option<String>,
    pub payment_attempt_id: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl TryFrom<OrderSearchParams> for OrderQueryFilter {
    type Error = ServerError;

    fn try_from(params: OrderSearchParams) -> Result<Self, Self::Error> {
        let status = params
            .status
            .map(|s| parse_list::<OrderStatusType>(&s))
            .transpose()?
            .filter(|v| !v.is_empty());
        let origin = params
            .origin
            .map(|o| Origin::from_str(o.trim()).map_err(|e| ServerError::InvalidQuery(e.to_string())))
            .transpose()?;
        Ok(OrderQueryFilter {
            customer_id: params.customer_id,
            contact_email: params.contact_email,
            payment_attempt_id: params.payment_attempt_id,
            origin,
            since: params.since,
            until: params.until,
            status,
        })
    }
}

/// Query parameters for `GET /api/inventory?ids=1,2,3`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockQuery {
    pub ids: String,
}

impl StockQuery {
    pub fn product_ids(&self) -> Result<Vec<ProductId>, ServerError> {
        let ids = parse_list::<ProductId>(&self.ids)?;
        if ids.is_empty() {
            return Err(ServerError::InvalidQuery("At least one product id is required".into()));
        }
        Ok(ids)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PickupCodeResponse {
    pub order_id: OrderId,
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

fn parse_list<T>(s: &str) -> Result<Vec<T>, ServerError>
where
    T: FromStr,
    T::Err: Display,
{
    s.split(',')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| v.parse::<T>().map_err(|e| ServerError::InvalidQuery(format!("'{v}': {e}"))))
        .collect()
}
