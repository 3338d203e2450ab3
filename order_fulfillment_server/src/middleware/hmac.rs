//! HMAC middleware for Actix Web.
//!
//! The payment gateway signs every webhook delivery. The signature is the hex-encoded HMAC-SHA256 of the raw request
//! body, keyed with `OFE_WEBHOOK_HMAC_SECRET`, and is sent in the `X-Webhook-Signature` header.
//!
//! Wrap the webhook scope with [`HmacMiddlewareFactory`] to reject deliveries with a missing or invalid signature
//! before they reach the handler. The body is read in full, checked, and handed on to the handler unchanged.

use std::{
    future::{ready, Ready},
    rc::Rc,
};

use actix_http::h1;
use actix_web::{
    dev::{forward_ready, Payload, Service, ServiceRequest, ServiceResponse, Transform},
    error::{ErrorBadRequest, ErrorForbidden},
    web::Bytes,
    Error,
};
use futures::future::LocalBoxFuture;
use log::{trace, warn};
use ofe_common::Secret;

use crate::helpers::verify_hmac;

struct SignatureCheck {
    header: String,
    secret: Secret<String>,
    // When false, every request is let through unchecked
    enabled: bool,
}

impl SignatureCheck {
    /// Reads the body and checks it against the signature header. On success the body is returned so that it can be
    /// put back into the request.
    async fn verified_body(&self, req: &mut ServiceRequest) -> Result<Bytes, Error> {
        let signature = req
            .headers()
            .get(&self.header)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                warn!("🔐️ No webhook signature found in request. Denying access.");
                ErrorForbidden("No webhook signature found.")
            })?;
        let body = req.extract::<Bytes>().await.map_err(|e| {
            warn!("🔐️ Failed to extract request data: {:?}", e);
            ErrorBadRequest("Failed to extract request data.")
        })?;
        if !verify_hmac(self.secret.reveal(), body.as_ref(), &signature) {
            warn!("🔐️ Invalid webhook signature. Denying access.");
            return Err(ErrorForbidden("Invalid webhook signature."));
        }
        trace!("🔐️ Webhook signature check ✅️");
        Ok(body)
    }
}

pub struct HmacMiddlewareFactory {
    check: Rc<SignatureCheck>,
}

impl HmacMiddlewareFactory {
    pub fn new(hmac_header: &str, key: Secret<String>, enabled: bool) -> Self {
        let check = SignatureCheck { header: hmac_header.to_string(), secret: key, enabled };
        Self { check: Rc::new(check) }
    }
}

impl<S, B> Transform<S, ServiceRequest> for HmacMiddlewareFactory
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;
    type InitError = ();
    type Response = ServiceResponse<B>;
    type Transform = HmacMiddlewareService<S>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(HmacMiddlewareService { check: Rc::clone(&self.check), service: Rc::new(service) }))
    }
}

pub struct HmacMiddlewareService<S> {
    check: Rc<SignatureCheck>,
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for HmacMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;
    type Response = ServiceResponse<B>;

    forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);
        let check = Rc::clone(&self.check);
        Box::pin(async move {
            if check.enabled {
                let body = check.verified_body(&mut req).await?;
                req.set_payload(replay_payload(body));
            } else {
                trace!("🔐️ Webhook signature checks are disabled. Allowing request.");
            }
            service.call(req).await
        })
    }
}

/// A fresh payload holding the bytes that were already read from the request.
fn replay_payload(body: Bytes) -> Payload {
    let (_, mut payload) = h1::Payload::create(true);
    payload.unread_data(body);
    Payload::from(payload)
}
