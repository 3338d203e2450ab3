use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{Duration, Utc};
use ofe_common::Secret;
use order_fulfillment_engine::{
    db_types::{OrderId, OrderStatusType, StationId},
    events::EventProducers,
    helpers::PickupCode,
    ofe_api::redemption_objects::RedemptionReceipt,
    traits::RedemptionOutcome,
    OrderFlowApi,
    RedemptionApi,
};
use serde_json::Value;

use super::{
    helpers::{get_request, json_post, post_request, sample_line, sample_order, send},
    mocks::MockBackend,
};
use crate::{
    config::PickupCodeConfig,
    helpers::IDEMPOTENCY_KEY_HEADER,
    routes::{PickupCodeRoute, RedeemRoute, REPLAY_HEADER},
};

const PICKUP_SECRET: &str = "pickup-secret-for-tests";
const STORED_RESPONSE: &str = r#"{"orderId":9,"stationId":2,"matched":1,"redeemed":1,"items":[]}"#;

fn pickup_config() -> PickupCodeConfig {
    PickupCodeConfig { secret: Secret::new(PICKUP_SECRET.to_string()), max_age: Duration::minutes(10) }
}

#[actix_web::test]
async fn retry_with_header_key_is_replayed() {
    let _ = env_logger::try_init().ok();
    let req = json_post("/stations/2/redeem", r#"{"order_id":9}"#).insert_header((IDEMPOTENCY_KEY_HEADER, "retry-1"));
    let res = send(req, configure_redeem).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.headers.get(REPLAY_HEADER).unwrap(), "true");
    assert_eq!(res.body, STORED_RESPONSE);
}

#[actix_web::test]
async fn body_key_wins_over_header() {
    let _ = env_logger::try_init().ok();
    let req = json_post("/stations/2/redeem", r#"{"order_id":9,"idempotency_key":"body-key"}"#)
        .insert_header((IDEMPOTENCY_KEY_HEADER, "header-key"));
    let res = send(req, configure_redeem).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::OK);
    assert!(res.headers.get(REPLAY_HEADER).is_none());
    let json: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(json["orderId"], 9);
    assert_eq!(json["stationId"], 2);
    assert_eq!(json["redeemed"], 1);
    assert_eq!(json["items"][0]["title"], "Fries");
}

#[actix_web::test]
async fn malformed_redemption_requests() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/stations/2/redeem", r#"{"order_id":9,"idempotency_key":"no spaces please"}"#, configure_redeem)
            .await
            .unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("idempotency key"), "{body}");
    let (status, _) = post_request("/stations/2/redeem", "{}", configure_redeem).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) =
        post_request("/stations/2/redeem", r#"{"order_id":9,"pickup_code":"v=1"}"#, configure_redeem).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn redeem_with_pickup_code() {
    let _ = env_logger::try_init().ok();
    let code = PickupCode::issue(OrderId(9), &Secret::new(PICKUP_SECRET.to_string())).unwrap();
    let body = serde_json::json!({ "pickup_code": code.to_string(), "idempotency_key": "body-key" }).to_string();
    let (status, _) = post_request("/stations/2/redeem", &body, configure_redeem).await.unwrap();
    assert_eq!(status, StatusCode::OK);

    let forged = PickupCode::issue(OrderId(9), &Secret::new("guessed".to_string())).unwrap();
    let body = serde_json::json!({ "pickup_code": forged.to_string() }).to_string();
    let (status, body) = post_request("/stations/2/redeem", &body, configure_redeem).await.unwrap();
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body.contains("Invalid pickup code"), "{body}");
}

fn configure_redeem(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend
        .expect_redeem_for_station()
        .withf(|station, order, claim| {
            let key = claim.as_ref().map(|c| (c.scope.as_str(), c.key.as_str()));
            *station == StationId(2) && *order == OrderId(9) && key == Some(("station:2:order:9", "retry-1"))
        })
        .returning(|_, _, _| Ok(RedemptionOutcome::Replayed { response: STORED_RESPONSE.to_string() }));
    backend
        .expect_redeem_for_station()
        .withf(|_, order, claim| *order == OrderId(9) && claim.as_ref().map(|c| c.key.as_str()) == Some("body-key"))
        .returning(|station, order, _| {
            let mut line = sample_line(31, order.value(), 2, "Fries", 1);
            line.redemption_id = Some(1);
            let receipt = RedemptionReceipt::new(station, order, 1, &[line], Utc::now());
            let response = serde_json::to_string(&receipt).unwrap();
            Ok(RedemptionOutcome::Redeemed { receipt, response })
        });
    let api = RedemptionApi::new(backend);
    cfg.service(RedeemRoute::<MockBackend>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(pickup_config()));
}

#[actix_web::test]
async fn pickup_codes_are_only_issued_for_paid_orders() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/9/pickup_code", configure_pickup_codes).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["orderId"], 9);
    let code = json["code"].as_str().unwrap();
    let secret = Secret::new(PICKUP_SECRET.to_string());
    let order_id = PickupCode::verify(code, &secret, Duration::minutes(10), Utc::now()).unwrap();
    assert_eq!(order_id, OrderId(9));

    let (status, _) = get_request("/orders/10/pickup_code", configure_pickup_codes).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = get_request("/orders/11/pickup_code", configure_pickup_codes).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn configure_pickup_codes(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        Ok(match id.value() {
            9 => Some(sample_order(9, OrderStatusType::Paid, 1200)),
            10 => Some(sample_order(10, OrderStatusType::Pending, 1200)),
            _ => None,
        })
    });
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(PickupCodeRoute::<MockBackend>::new())
        .app_data(web::Data::new(api))
        .app_data(web::Data::new(pickup_config()));
}
