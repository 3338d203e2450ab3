//! # Pickup codes
//!
//! A pickup code is what a customer shows at a station (usually as a QR code) to collect a paid order. It names the
//! order and is signed by the server, so stations can trust the order id without looking anything else up, and a
//! customer cannot forge a code for someone else's order.
//!
//! ## Format
//!
//! ```text
//!    v=1;orderId={order_id};issuedAt={rfc3339};sig={signature}
//! ```
//!
//! where
//!   * `order_id` is the numeric order id,
//!   * `issuedAt` is the issue time in UTC, whole seconds, e.g. `2024-06-01T12:30:00Z`,
//!   * `signature` is the unpadded base64url encoding of `HMAC-SHA256(secret, "v=1;orderId=..;issuedAt=..")`.
//!
//! Codes expire. A code older than the configured maximum age, or issued noticeably in the future, is rejected.
use std::{collections::HashMap, fmt::Display};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use ofe_common::Secret;
use sha2::Sha256;
use thiserror::Error;

use crate::db_types::OrderId;

pub const PICKUP_CODE_VERSION: &str = "1";
/// How far in the future an `issuedAt` may lie before the code is considered forged.
const MAX_CLOCK_SKEW_SECONDS: i64 = 60;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PickupCodeError {
    #[error("Unsupported pickup code version")]
    InvalidVersion,
    #[error("The pickup code does not contain a valid order id")]
    InvalidOrderId,
    #[error("The pickup code does not contain a valid issue time")]
    InvalidIssuedAt,
    #[error("The pickup code has expired")]
    Expired,
    #[error("The pickup code signature is missing")]
    MissingSignature,
    #[error("The pickup code signature is invalid")]
    BadSignature,
    #[error("No pickup code secret has been configured")]
    NoSecret,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickupCode {
    pub order_id: OrderId,
    pub issued_at: DateTime<Utc>,
    signature: String,
}

impl PickupCode {
    /// Issues a code for the order, stamped with the current time.
    pub fn issue(order_id: OrderId, secret: &Secret<String>) -> Result<Self, PickupCodeError> {
        Self::issue_at(order_id, Utc::now(), secret)
    }

    pub fn issue_at(
        order_id: OrderId,
        issued_at: DateTime<Utc>,
        secret: &Secret<String>,
    ) -> Result<Self, PickupCodeError> {
        let issued_at = format_issued_at(issued_at);
        let payload = signed_payload(PICKUP_CODE_VERSION, order_id, &issued_at);
        let signature = base64::encode_config(hmac_for(&payload, secret)?, base64::URL_SAFE_NO_PAD);
        // Round-trip through the string form so that `issued_at` has exactly the precision that was signed.
        let issued_at = parse_issued_at(&issued_at)?;
        Ok(Self { order_id, issued_at, signature })
    }

    /// Parses and checks a code, returning the order it names.
    pub fn verify(
        code: &str,
        secret: &Secret<String>,
        max_age: Duration,
        now: DateTime<Utc>,
    ) -> Result<OrderId, PickupCodeError> {
        let parts = parse_parts(code);
        if parts.get("v").copied() != Some(PICKUP_CODE_VERSION) {
            return Err(PickupCodeError::InvalidVersion);
        }
        let order_id_str = parts.get("orderId").copied().ok_or(PickupCodeError::InvalidOrderId)?;
        let order_id = order_id_str
            .parse::<i64>()
            .ok()
            .filter(|id| *id > 0)
            .map(OrderId)
            .ok_or(PickupCodeError::InvalidOrderId)?;
        let issued_at_str = parts.get("issuedAt").copied().ok_or(PickupCodeError::InvalidIssuedAt)?;
        let issued_at = parse_issued_at(issued_at_str)?;
        if now - issued_at > max_age {
            return Err(PickupCodeError::Expired);
        }
        if issued_at - now > Duration::seconds(MAX_CLOCK_SKEW_SECONDS) {
            return Err(PickupCodeError::InvalidIssuedAt);
        }
        let sig = parts.get("sig").copied().filter(|s| !s.is_empty()).ok_or(PickupCodeError::MissingSignature)?;
        let sig = base64::decode_config(sig, base64::URL_SAFE_NO_PAD).map_err(|_| PickupCodeError::BadSignature)?;
        // The payload is rebuilt from the raw fields, exactly as they were presented.
        let payload = format!("v={PICKUP_CODE_VERSION};orderId={order_id_str};issuedAt={issued_at_str}");
        let mut mac = new_mac(secret)?;
        mac.update(payload.as_bytes());
        mac.verify_slice(&sig).map_err(|_| PickupCodeError::BadSignature)?;
        Ok(order_id)
    }

    pub fn payload(&self) -> String {
        signed_payload(PICKUP_CODE_VERSION, self.order_id, &format_issued_at(self.issued_at))
    }
}

impl Display for PickupCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{};sig={}", self.payload(), self.signature)
    }
}

fn signed_payload(version: &str, order_id: OrderId, issued_at: &str) -> String {
    format!("v={version};orderId={};issuedAt={issued_at}", order_id.value())
}

fn format_issued_at(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_issued_at(s: &str) -> Result<DateTime<Utc>, PickupCodeError> {
    DateTime::parse_from_rfc3339(s).map(|t| t.with_timezone(&Utc)).map_err(|_| PickupCodeError::InvalidIssuedAt)
}

fn parse_parts(code: &str) -> HashMap<&str, &str> {
    code.trim().split(';').filter_map(|part| part.split_once('=')).map(|(k, v)| (k.trim(), v.trim())).collect()
}

fn new_mac(secret: &Secret<String>) -> Result<HmacSha256, PickupCodeError> {
    if secret.is_empty() {
        return Err(PickupCodeError::NoSecret);
    }
    HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| PickupCodeError::NoSecret)
}

fn hmac_for(payload: &str, secret: &Secret<String>) -> Result<Vec<u8>, PickupCodeError> {
    let mut mac = new_mac(secret)?;
    mac.update(payload.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}
