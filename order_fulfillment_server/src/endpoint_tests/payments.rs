use actix_web::{http::StatusCode, web, web::ServiceConfig};
use ofe_common::Secret;
use order_fulfillment_engine::{
    db_types::{Cents, OrderStatusType},
    events::EventProducers,
    traits::TransitionResult,
    PaymentApi,
};
use serde_json::Value;

use super::{
    helpers::{json_post, post_request, sample_order, send},
    mocks::MockBackend,
};
use crate::{
    helpers::{calculate_hmac, WEBHOOK_SIGNATURE_HEADER},
    middleware::HmacMiddlewareFactory,
    routes::{PayCardRoute, PayCashRoute, PaymentWebhookRoute},
};

const WEBHOOK_SECRET: &str = "whsec_endpoint_tests";

#[actix_web::test]
async fn cash_payment_that_falls_short() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/pos/orders/5/cash", r#"{"amount_received":900}"#, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert!(body.contains("Insufficient payment"), "{body}");
}

#[actix_web::test]
async fn cash_payment_with_change() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/pos/orders/5/cash", r#"{"amount_received":1500}"#, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["change"], 500);
    assert_eq!(json["amount_received"], 1500);
    assert_eq!(json["order"]["status"], "paid");
}

#[actix_web::test]
async fn cash_payment_for_a_paid_order() {
    let _ = env_logger::try_init().ok();
    let (status, _) =
        post_request("/pos/orders/6/cash", r#"{"amount_received":1500}"#, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) =
        post_request("/pos/orders/99/cash", r#"{"amount_received":1500}"#, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[actix_web::test]
async fn declined_card_leaves_the_order_pending() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"processor":"acme-pay","transaction_id":"tx-77","status":"DECLINED"}"#;
    let (status, body) = post_request("/pos/orders/5/card", body, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["outcome"], "not_paid");
    assert_eq!(json["order"]["status"], "pending");
    assert_eq!(json["order"]["card_status"], "DECLINED");

    let body = r#"{"processor":" ","status":"DECLINED"}"#;
    let (status, _) = post_request("/pos/orders/5/card", body, configure_payments).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure_payments(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        Ok(match id.value() {
            5 => Some(sample_order(5, OrderStatusType::Pending, 1000)),
            6 => Some(sample_order(6, OrderStatusType::Paid, 1000)),
            _ => None,
        })
    });
    backend
        .expect_change_order_status()
        .withf(|c| {
            let change = c.payment.as_ref().and_then(|p| p.cash_change);
            c.to == OrderStatusType::Paid && change == Some(Cents::from(500))
        })
        .returning(|_| {
            let mut order = sample_order(5, OrderStatusType::Paid, 1000);
            order.cash_received = Some(Cents::from(1500));
            order.cash_change = Some(Cents::from(500));
            Ok(TransitionResult { order, reversals: vec![] })
        });
    backend.expect_record_payment_details().returning(|_, details| {
        let mut order = sample_order(5, OrderStatusType::Pending, 1000);
        order.card_processor = details.card_processor;
        order.card_status = details.card_status;
        Ok(order)
    });
    let api = PaymentApi::new(backend, EventProducers::default());
    cfg.service(PayCashRoute::<MockBackend>::new())
        .service(PayCardRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

const DUPLICATE_SUCCESS: &str = r#"{"eventType":"payment.succeeded","clientReference":"6","transactionId":"tx-1"}"#;

#[actix_web::test]
async fn webhook_without_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let err = send(json_post("/webhook/payment", DUPLICATE_SUCCESS), configure_webhook)
        .await
        .expect_err("Expected the call to be rejected");
    assert_eq!(err, "No webhook signature found.");
}

#[actix_web::test]
async fn webhook_with_bad_signature_is_rejected() {
    let _ = env_logger::try_init().ok();
    let signature = calculate_hmac("some other secret", DUPLICATE_SUCCESS.as_bytes()).unwrap();
    let req = json_post("/webhook/payment", DUPLICATE_SUCCESS).insert_header((WEBHOOK_SIGNATURE_HEADER, signature));
    let err = send(req, configure_webhook).await.expect_err("Expected the call to be rejected");
    assert_eq!(err, "Invalid webhook signature.");
}

#[actix_web::test]
async fn duplicate_success_is_acknowledged() {
    let _ = env_logger::try_init().ok();
    let signature = calculate_hmac(WEBHOOK_SECRET, DUPLICATE_SUCCESS.as_bytes()).unwrap();
    let req = json_post("/webhook/payment", DUPLICATE_SUCCESS).insert_header((WEBHOOK_SIGNATURE_HEADER, signature));
    let res = send(req, configure_webhook).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"outcome":"already_paid","order":6}"#);
}

#[actix_web::test]
async fn unknown_events_are_acknowledged() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"eventType":"payment.pending","clientReference":"6"}"#;
    let signature = calculate_hmac(WEBHOOK_SECRET, body.as_bytes()).unwrap();
    let req = json_post("/webhook/payment", body).insert_header((WEBHOOK_SIGNATURE_HEADER, signature));
    let res = send(req, configure_webhook).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body, r#"{"outcome":"ignored"}"#);
}

fn configure_webhook(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| Ok(Some(sample_order(id.value(), OrderStatusType::Paid, 1000))));
    backend.expect_change_order_status().never();
    let api = PaymentApi::new(backend, EventProducers::default());
    let hmac = HmacMiddlewareFactory::new(WEBHOOK_SIGNATURE_HEADER, Secret::new(WEBHOOK_SECRET.to_string()), true);
    cfg.service(web::scope("/webhook").wrap(hmac).service(PaymentWebhookRoute::<MockBackend>::new()))
        .app_data(web::Data::new(api));
}
