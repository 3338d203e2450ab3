use std::collections::HashMap;

use actix_web::{http::StatusCode, web, web::ServiceConfig};
use chrono::{TimeZone, Utc};
use order_fulfillment_engine::{
    db_types::{Cents, InventoryLedgerEntry, LedgerReason, OrderId, Product, ProductId, ProductType},
    events::EventProducers,
    InventoryApi,
};
use serde_json::Value;

use super::{
    helpers::{get_request, json_post, post_request, send},
    mocks::MockBackend,
};
use crate::{
    helpers::ACTOR_HEADER,
    routes::{AdjustStockRoute, StockBatchRoute, StockLedgerRoute, StockRoute},
};

#[actix_web::test]
async fn current_stock() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/inventory/3", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"{"productId":3,"stock":47}"#);
}

#[actix_web::test]
async fn batch_stock_reports_zero_for_products_without_entries() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/inventory?ids=3,4", configure).await.expect("Request failed");
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, r#"[{"productId":3,"stock":47},{"productId":4,"stock":0}]"#);

    let (status, _) = get_request("/inventory?ids=3,fries", configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn ledger_is_paged() {
    let _ = env_logger::try_init().ok();
    let (status, body) = get_request("/inventory/3/ledger?offset=20&count=10", configure).await.unwrap();
    assert_eq!(status, StatusCode::OK);
    let json: Value = serde_json::from_str(&body).unwrap();
    let entries = json.as_array().unwrap();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0]["reason"], "sale");
    assert_eq!(entries[0]["delta"], -3);
}

#[actix_web::test]
async fn manual_adjustment() {
    let _ = env_logger::try_init().ok();
    let req = json_post("/inventory/3/adjust", r#"{"delta":12}"#).insert_header((ACTOR_HEADER, "stock-room"));
    let res = send(req, configure).await.expect("Request failed");
    assert_eq!(res.status, StatusCode::CREATED);
    let json: Value = serde_json::from_str(&res.body).unwrap();
    assert_eq!(json["reason"], "manual_adjust");
    assert_eq!(json["actor"], "stock-room");
}

#[actix_web::test]
async fn invalid_adjustments() {
    let _ = env_logger::try_init().ok();
    let (status, body) =
        post_request("/inventory/3/adjust", r#"{"delta":-2,"reason":"sale"}"#, configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body.contains("sale"), "{body}");
    let (status, _) = post_request("/inventory/3/adjust", r#"{"delta":0}"#, configure).await.unwrap();
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = post_request("/inventory/8/adjust", r#"{"delta":5}"#, configure).await.unwrap();
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn entry(
    id: i64,
    delta: i64,
    reason: LedgerReason,
    order_id: Option<OrderId>,
    actor: Option<String>,
) -> InventoryLedgerEntry {
    InventoryLedgerEntry {
        id,
        product_id: ProductId(3),
        delta,
        reason,
        order_id,
        order_line_id: None,
        actor,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
    }
}

fn configure(cfg: &mut ServiceConfig) {
    let mut backend = MockBackend::new();
    backend.expect_current_stock().returning(|_| Ok(47));
    backend.expect_current_stock_batch().returning(|ids| {
        let mut levels = HashMap::new();
        if ids.contains(&ProductId(3)) {
            levels.insert(ProductId(3), 47);
        }
        Ok(levels)
    });
    backend
        .expect_entries_for_product()
        .withf(|id, page| *id == ProductId(3) && page.offset() == 20 && page.count() == 10)
        .returning(|_, _| {
            Ok(vec![
                entry(9, -3, LedgerReason::Sale, Some(OrderId(4)), None),
                entry(1, 50, LedgerReason::OpeningBalance, None, Some("setup".into())),
            ])
        });
    backend.expect_fetch_products().returning(|ids| {
        let fries = Product {
            id: ProductId(3),
            name: "Fries".into(),
            price: Cents::from(400),
            is_active: true,
            product_type: ProductType::Simple,
        };
        Ok(if ids.contains(&fries.id) { vec![fries] } else { vec![] })
    });
    backend
        .expect_append()
        .withf(|e| e.delta == 12 && e.reason == LedgerReason::ManualAdjust && e.actor.as_deref() == Some("stock-room"))
        .returning(|e| Ok(entry(10, e.delta, e.reason, None, e.actor)));
    let api = InventoryApi::new(backend, EventProducers::default());
    cfg.service(StockBatchRoute::<MockBackend>::new())
        .service(StockRoute::<MockBackend>::new())
        .service(StockLedgerRoute::<MockBackend>::new())
        .service(AdjustStockRoute::<MockBackend>::new())
        .app_data(web::Data::new(api));
}
