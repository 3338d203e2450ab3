use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db_types::{Order, OrderLine, OrderStatusType, Origin},
    traits::OrderFlowError,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderWithLines {
    pub order: Order,
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderQueryFilter {
    pub customer_id: Option<String>,
    pub contact_email: Option<String>,
    pub payment_attempt_id: Option<String>,
    pub origin: Option<Origin>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub status: Option<Vec<OrderStatusType>>,
}

impl OrderQueryFilter {
    pub fn since<T>(mut self, since: T) -> Result<Self, OrderFlowError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = since.try_into().map_err(|e| OrderFlowError::QueryError(e.to_string()))?;
        self.since = Some(dt);
        Ok(self)
    }

    pub fn until<T>(mut self, until: T) -> Result<Self, OrderFlowError>
    where
        T: TryInto<DateTime<Utc>>,
        T::Error: Display,
    {
        let dt = until.try_into().map_err(|e| OrderFlowError::QueryError(e.to_string()))?;
        self.until = Some(dt);
        Ok(self)
    }

    pub fn with_customer_id<S: Into<String>>(mut self, customer_id: S) -> Self {
        self.customer_id = Some(customer_id.into());
        self
    }

    pub fn with_contact_email<S: Into<String>>(mut self, email: S) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    pub fn with_payment_attempt_id<S: Into<String>>(mut self, attempt_id: S) -> Self {
        self.payment_attempt_id = Some(attempt_id.into());
        self
    }

    pub fn with_origin(mut self, origin: Origin) -> Self {
        self.origin = Some(origin);
        self
    }

    pub fn with_status(mut self, status: OrderStatusType) -> Self {
        let mut statuses = self.status.take().unwrap_or_default();
        if !statuses.contains(&status) {
            statuses.push(status);
        }
        self.status = Some(statuses);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.customer_id.is_none()
            && self.contact_email.is_none()
            && self.payment_attempt_id.is_none()
            && self.origin.is_none()
            && self.since.is_none()
            && self.until.is_none()
            && self.status.as_ref().map(|s| s.is_empty()).unwrap_or(true)
    }
}

impl Display for OrderQueryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_empty() {
            return write!(f, "No filters");
        }
        write!(f, "OrderQueryFilter: ")?;
        if let Some(customer_id) = &self.customer_id {
            write!(f, "customer_id: {customer_id}. ")?;
        }
        if let Some(email) = &self.contact_email {
            write!(f, "contact_email: {email}. ")?;
        }
        if let Some(attempt) = &self.payment_attempt_id {
            write!(f, "payment_attempt_id: {attempt}. ")?;
        }
        if let Some(origin) = &self.origin {
            write!(f, "origin: {origin}. ")?;
        }
        if let Some(since) = &self.since {
            write!(f, "since: {since}. ")?;
        }
        if let Some(until) = &self.until {
            write!(f, "until: {until}. ")?;
        }
        if let Some(status) = &self.status {
            let statuses = status.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(",");
            write!(f, "status: [{statuses}]. ")?;
        }
        Ok(())
    }
}
