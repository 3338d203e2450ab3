use actix_web::{
    body::MessageBody,
    http::{header::HeaderMap, StatusCode},
    test,
    test::TestRequest,
    web::ServiceConfig,
    App,
};
use chrono::{TimeZone, Utc};
use log::debug;
use order_fulfillment_engine::db_types::{
    Cents,
    LineType,
    Order,
    OrderId,
    OrderLine,
    OrderStatusType,
    Origin,
    ProductId,
};

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

pub async fn get_request(path: &str, configure: fn(&mut ServiceConfig)) -> Result<(StatusCode, String), String> {
    let res = send(TestRequest::get().uri(path), configure).await?;
    Ok((res.status, res.body))
}

pub async fn post_request(
    path: &str,
    body: &str,
    configure: fn(&mut ServiceConfig),
) -> Result<(StatusCode, String), String> {
    let res = send(json_post(path, body), configure).await?;
    Ok((res.status, res.body))
}

pub fn json_post(path: &str, body: &str) -> TestRequest {
    TestRequest::post().uri(path).insert_header(("Content-Type", "application/json")).set_payload(body.to_string())
}

pub async fn send(req: TestRequest, configure: fn(&mut ServiceConfig)) -> Result<TestResponse, String> {
    let app = App::new().configure(configure);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req.to_request()).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let headers = res.headers().clone();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok(TestResponse { status, headers, body })
}

pub fn sample_order(id: i64, status: OrderStatusType, total: i64) -> Order {
    let created_at = Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap();
    Order {
        id: OrderId(id),
        status,
        total: Cents::from(total),
        origin: Origin::Pos,
        customer_id: None,
        contact_email: None,
        payment_attempt_id: None,
        payment_method: None,
        gateway_session_id: None,
        gateway_transaction_id: None,
        cash_received: None,
        cash_change: None,
        card_processor: None,
        card_transaction_id: None,
        card_status: None,
        created_at,
        updated_at: created_at,
    }
}

pub fn sample_line(id: i64, order_id: i64, product_id: i64, title: &str, quantity: i64) -> OrderLine {
    OrderLine {
        id,
        order_id: OrderId(order_id),
        line_type: LineType::Simple,
        product_id: ProductId(product_id),
        title: title.to_string(),
        unit_price: Cents::from(400),
        quantity,
        parent_line_id: None,
        menu_slot_id: None,
        menu_slot_name: None,
        redemption_id: None,
        redeemed_at: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 12, 30, 0).unwrap(),
    }
}
