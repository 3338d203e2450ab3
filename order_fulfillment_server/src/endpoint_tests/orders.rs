use actix_web::{http::StatusCode, web, web::ServiceConfig};
use order_fulfillment_engine::{
    db_types::{Cents, LedgerReason, OrderStatusType, Origin, Product, ProductId, ProductType},
    events::EventProducers,
    traits::{CreatedOrder, TransitionResult},
    CheckoutApi,
    OrderFlowApi,
};
use serde_json::Value;

use super::{
    helpers::{get_request, json_post, post_request, sample_line, sample_order, send},
    mocks::MockBackend,
};
use crate::{
    helpers::ACTOR_HEADER,
    routes::{CheckoutRoute, OrderByIdRoute, PosOrderRoute, SearchOrdersRoute, UpdateOrderStatusRoute},
};

#[actix_web::test]
async fn fetch_order_with_lines() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/7", configure_orders).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order"]["id"], 7);
    assert_eq!(json["order"]["status"], "paid");
    assert_eq!(json["order"]["total"], 1200);
    assert_eq!(json["lines"].as_array().unwrap().len(), 2);
    assert_eq!(json["lines"][1]["title"], "Cola");
}

#[actix_web::test]
async fn fetch_missing_order() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders/8", configure_orders).await.expect("Request failed");
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.contains("does not exist"), "{body}");
}

#[actix_web::test]
async fn search_orders_by_status_and_origin() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/orders?status=pending,paid&origin=pos", configure_orders).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 1);

    let (status, body) = get_request("/orders?status=shipped", configure_orders).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("shipped"), "{body}");
}

#[actix_web::test]
async fn illegal_transition_is_a_conflict() {
    let _ = env_logger::try_init().ok();
    let (status, body) = post_request("/orders/4/status", r#"{"status":"paid"}"#, configure_orders).await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body.starts_with(r#"{"error":"#), "{body}");
}

#[actix_web::test]
async fn cancel_returns_stock_and_records_the_actor() {
    let _ = env_logger::try_init().ok();
    let req = json_post("/orders/3/status", r#"{"status":"cancelled"}"#).insert_header((ACTOR_HEADER, "till-2"));
    let res = send(req, configure_orders).await.unwrap();
    assert_eq!(res.status, StatusCode::OK);
    let json: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(json["status"], "cancelled");
}

fn configure_orders(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_order().returning(|id| {
        Ok(match id.value() {
            3 => Some(sample_order(3, OrderStatusType::Pending, 800)),
            4 => Some(sample_order(4, OrderStatusType::Refunded, 800)),
            7 => Some(sample_order(7, OrderStatusType::Paid, 1200)),
            _ => None,
        })
    });
    backend
        .expect_fetch_order_lines()
        .returning(|id| Ok(vec![sample_line(1, id.value(), 1, "Burger", 1), sample_line(2, id.value(), 3, "Cola", 1)]));
    backend
        .expect_search_orders()
        .withf(|f| {
            f.status == Some(vec![OrderStatusType::Pending, OrderStatusType::Paid]) && f.origin == Some(Origin::Pos)
        })
        .returning(|_| Ok(vec![sample_order(3, OrderStatusType::Pending, 800)]));
    backend
        .expect_change_order_status()
        .withf(|c| {
            c.order_id.value() == 3 &&
                c.from == OrderStatusType::Pending &&
                c.to == OrderStatusType::Cancelled &&
                c.reversal == Some(LedgerReason::Cancellation) &&
                c.actor.as_deref() == Some("till-2")
        })
        .returning(|_| {
            let order = sample_order(3, OrderStatusType::Cancelled, 800);
            Ok(TransitionResult { order, reversals: vec![] })
        });
    let api = OrderFlowApi::new(backend, EventProducers::default());
    cfg.service(SearchOrdersRoute::<MockBackend>::new())
        .service(OrderByIdRoute::<MockBackend>::new())
        .service(UpdateOrderStatusRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}

#[actix_web::test]
async fn web_checkout_creates_a_pending_order() {
    let _ = env_logger::try_init().ok();
    let body = r#"{"items":[{"product_id":2,"quantity":2}],"contact_email":"sam@example.com"}"#;
    let (status, body) = post_request("/checkout", body, configure_checkout).await.unwrap();
    assert_eq!(status, StatusCode::CREATED);
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["order_id"], 11);
    assert_eq!(json["status"], "pending");
    assert_eq!(json["total"], 800);
}

#[actix_web::test]
async fn checkout_validation_errors() {
    let _ = env_logger::try_init().ok();
    let (status, _) = post_request("/checkout", r#"{"items":[]}"#, configure_checkout).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) =
        post_request("/pos/orders", r#"{"items":[{"product_id":5,"quantity":1}]}"#, configure_checkout).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("not available"), "{body}");
    let (status, _) =
        post_request("/checkout", r#"{"items":[{"product_id":2,"quantity":0}]}"#, configure_checkout).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

fn configure_checkout(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_fetch_products().returning(|ids| {
        let catalog = [
            Product {
                id: ProductId(2),
                name: "Fries".into(),
                price: Cents::from(400),
                is_active: true,
                product_type: ProductType::Simple,
            },
            Product {
                id: ProductId(5),
                name: "Shake".into(),
                price: Cents::from(500),
                is_active: false,
                product_type: ProductType::Simple,
            },
        ];
        Ok(catalog.into_iter().filter(|p| ids.contains(&p.id)).collect())
    });
    backend.expect_fetch_slots_for_products().returning(|_| Ok(vec![]));
    backend.expect_fetch_slot_options().returning(|_| Ok(vec![]));
    backend
        .expect_create_order()
        .withf(|draft| {
            draft.order.total == Cents::from(800) &&
                draft.order.origin == Origin::Web &&
                draft.order.contact_email.as_deref() == Some("sam@example.com")
        })
        .returning(|_| {
            Ok(CreatedOrder {
                order: sample_order(11, OrderStatusType::Pending, 800),
                lines: vec![sample_line(20, 11, 2, "Fries", 2)],
                reservations: vec![],
            })
        });
    let api = CheckoutApi::new(backend, EventProducers::default());
    cfg.service(CheckoutRoute::<MockBackend>::new())
        .service(PosOrderRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}
