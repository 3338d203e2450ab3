//! Request handler definitions
//!
//! Define each route and its handler here. Handlers are thin: they pull the inputs out of the request, call the
//! matching engine API and serialize the result. Engine errors are mapped to HTTP status codes by [`ServerError`].
//!
//! A note about performance:
//! Since each worker thread processes its requests sequentially, handlers which block the current thread will cause the
//! current worker to stop processing new requests. Every handler here is async, and all database work is awaited, so
//! a slow query only parks the request that made it.
use actix_web::{get, web, HttpRequest, HttpResponse, Responder};
use log::*;
use order_fulfillment_engine::{
    db_types::{OrderId, OrderStatusType, Origin, ProductId, StationId},
    helpers::{PickupCode, PickupCodeError},
    ofe_api::{
        checkout_objects::CheckoutRequest,
        inventory_objects::{Pagination, StockAdjustment, StockLevel},
        order_objects::OrderQueryFilter,
        payment_objects::{CardPayment, CashPayment, GatewayEvent},
    },
    traits::{CatalogReader, InventoryLedger, OrderManagement, RedemptionStore},
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    PaymentApi,
    RedemptionApi,
};

use crate::{
    config::PickupCodeConfig,
    data_objects::{
        OrderSearchParams,
        PickupCodeResponse,
        RedeemRequest,
        RedeemTarget,
        StatusUpdateRequest,
        StockQuery,
    },
    errors::ServerError,
    helpers::{actor_id, idempotency_key},
};

pub const REPLAY_HEADER: &str = "X-Idempotent-Replay";

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:path),+) => {
        paste::paste! { pub struct [<$name:camel Route>]<B>(core::marker::PhantomData<fn() -> B>);}
        paste::paste! { impl<B> [<$name:camel Route>]<B> {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self(core::marker::PhantomData::<fn() -> B>)
            }
        }}
        paste::paste! { impl<B> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<B>
        where
            B: $($bounds +)+ 'static,
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::<B>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Checkout  ----------------------------------------------------
route!(checkout => Post "/checkout" impl CatalogReader, OrderManagement, InventoryLedger);
/// Web checkout. Validates and prices the cart, and creates a pending order that reserves its stock.
///
/// The body is a [`CheckoutRequest`]. The response is the prepared order: its id, status, total and line items.
pub async fn checkout<B>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogReader + OrderManagement + InventoryLedger,
{
    prepare_order(&req, body.into_inner(), Origin::Web, api.as_ref()).await
}

route!(pos_order => Post "/pos/orders" impl CatalogReader, OrderManagement, InventoryLedger);
/// Same as [`checkout`], for orders keyed in at a POS terminal.
pub async fn pos_order<B>(
    req: HttpRequest,
    body: web::Json<CheckoutRequest>,
    api: web::Data<CheckoutApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogReader + OrderManagement + InventoryLedger,
{
    prepare_order(&req, body.into_inner(), Origin::Pos, api.as_ref()).await
}

async fn prepare_order<B>(
    req: &HttpRequest,
    request: CheckoutRequest,
    origin: Origin,
    api: &CheckoutApi<B>,
) -> Result<HttpResponse, ServerError>
where
    B: CatalogReader + OrderManagement + InventoryLedger,
{
    debug!("💻️ {origin} checkout request with {} items", request.items.len());
    let prepared = api.prepare_order(request, origin, actor_id(req)).await.map_err(|e| {
        debug!("💻️ Could not prepare order. {e}");
        e
    })?;
    Ok(HttpResponse::Created().json(prepared))
}

//----------------------------------------------   Payments  ----------------------------------------------------
route!(pay_cash => Post "/pos/orders/{order_id}/cash" impl OrderManagement, InventoryLedger);
/// Takes a cash payment for a pending order. The amount received must cover the total; the receipt carries the
/// change to give.
pub async fn pay_cash<B>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    body: web::Json<CashPayment>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let order_id = path.into_inner();
    let CashPayment { amount_received } = body.into_inner();
    debug!("💻️ Cash payment of {amount_received} for order #{}", order_id.value());
    let receipt = api.pay_cash(order_id, amount_received, actor_id(&req)).await?;
    Ok(HttpResponse::Ok().json(receipt))
}

route!(pay_card => Post "/pos/orders/{order_id}/card" impl OrderManagement, InventoryLedger);
/// Records a card terminal result. Only a `succeeded` status marks the order as paid; any other status is stored
/// with the order, which stays pending.
pub async fn pay_card<B>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    body: web::Json<CardPayment>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let order_id = path.into_inner();
    let payment = body.into_inner();
    debug!("💻️ Card result '{}' from {} for order #{}", payment.status, payment.processor, order_id.value());
    let outcome = api.pay_card(order_id, payment, actor_id(&req)).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

route!(payment_webhook => Post "/payment" impl OrderManagement, InventoryLedger);
/// Payment gateway callback. The signature has been checked by the HMAC middleware by the time this runs.
///
/// Every well-formed event is acknowledged with a 200, including duplicates and events for orders that can no longer
/// be paid, so that the gateway stops retrying. The body says what was done with it.
pub async fn payment_webhook<B>(
    body: web::Json<GatewayEvent>,
    api: web::Data<PaymentApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let event = body.into_inner();
    info!("💻️ Gateway event {} for '{}'", event.event_type, event.client_reference);
    let outcome = api.handle_gateway_event(event).await.map_err(|e| {
        warn!("💻️ Could not handle gateway event. {e}");
        e
    })?;
    Ok(HttpResponse::Ok().json(outcome))
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(order_by_id => Get "/orders/{order_id}" impl OrderManagement, InventoryLedger);
/// The order with all of its lines.
pub async fn order_by_id<B>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let order_id = path.into_inner();
    debug!("💻️ GET order #{}", order_id.value());
    let order = api
        .fetch_order_with_lines(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    Ok(HttpResponse::Ok().json(order))
}

route!(search_orders => Get "/orders" impl OrderManagement, InventoryLedger);
/// Order search. All query parameters are optional and combine with AND:
/// `status` (comma-separated), `origin`, `customer_id`, `contact_email`, `payment_attempt_id`, `since`, `until`.
pub async fn search_orders<B>(
    query: web::Query<OrderSearchParams>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let filter = OrderQueryFilter::try_from(query.into_inner())?;
    debug!("💻️ Order search. {filter}");
    let orders = api.search_orders(filter).await?;
    Ok(HttpResponse::Ok().json(orders))
}

route!(update_order_status => Post "/orders/{order_id}/status" impl OrderManagement, InventoryLedger);
/// Moves an order through the state machine. Cancelling or refunding returns the order's stock to inventory.
pub async fn update_order_status<B>(
    req: HttpRequest,
    path: web::Path<OrderId>,
    body: web::Json<StatusUpdateRequest>,
    api: web::Data<OrderFlowApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let order_id = path.into_inner();
    let target = body.into_inner().status;
    let actor = actor_id(&req);
    info!(
        "💻️ Status change to {target} requested for order #{} by {}",
        order_id.value(),
        actor.as_deref().unwrap_or("an unknown actor")
    );
    let order = api.transition_order(order_id, target, actor).await?;
    Ok(HttpResponse::Ok().json(order))
}

route!(pickup_code => Get "/orders/{order_id}/pickup_code" impl OrderManagement, InventoryLedger);
/// Issues a signed pickup code for a paid order.
pub async fn pickup_code<B>(
    path: web::Path<OrderId>,
    api: web::Data<OrderFlowApi<B>>,
    config: web::Data<PickupCodeConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: OrderManagement + InventoryLedger,
{
    let order_id = path.into_inner();
    let order = api
        .fetch_order(order_id)
        .await?
        .ok_or_else(|| ServerError::NoRecordFound(format!("Order {order_id} does not exist")))?;
    if order.status != OrderStatusType::Paid {
        return Err(ServerError::Conflict(format!("Order {order_id} is {} and has nothing to collect", order.status)));
    }
    let code = PickupCode::issue(order_id, &config.secret).map_err(|e| match e {
        PickupCodeError::NoSecret => ServerError::ConfigurationError(e.to_string()),
        e => ServerError::Unspecified(e.to_string()),
    })?;
    debug!("💻️ Pickup code issued for order #{}", order_id.value());
    let expires_at = code.issued_at + config.max_age;
    Ok(HttpResponse::Ok().json(PickupCodeResponse { order_id, code: code.to_string(), expires_at }))
}

//----------------------------------------------   Redemption  ----------------------------------------------------
route!(redeem => Post "/stations/{station_id}/redeem" impl RedemptionStore);
/// Hands out the lines of a paid order that the station serves.
///
/// The order is given either as `order_id` or as a signed `pickup_code`. An idempotency key may be passed in the body
/// or in the `Idempotency-Key` header. A retry with the same key returns the stored response body unchanged, with the
/// `X-Idempotent-Replay: true` header set.
pub async fn redeem<B>(
    req: HttpRequest,
    path: web::Path<StationId>,
    body: web::Json<RedeemRequest>,
    api: web::Data<RedemptionApi<B>>,
    pickup: web::Data<PickupCodeConfig>,
) -> Result<HttpResponse, ServerError>
where
    B: RedemptionStore,
{
    let station_id = path.into_inner();
    let request = body.into_inner();
    let key = request.idempotency_key.clone().or_else(|| idempotency_key(&req));
    let reply = match request.target()? {
        RedeemTarget::Order(order_id) => {
            debug!("💻️ Station #{} redeeming order #{}", station_id.value(), order_id.value());
            api.redeem(station_id, order_id, key.as_deref()).await?
        },
        RedeemTarget::PickupCode(code) => {
            debug!("💻️ Station #{} redeeming a pickup code", station_id.value());
            api.redeem_with_pickup_code(station_id, &code, key.as_deref(), &pickup.secret, pickup.max_age).await?
        },
    };
    let mut res = HttpResponse::Ok();
    res.content_type("application/json");
    if reply.replayed {
        res.insert_header((REPLAY_HEADER, "true"));
    }
    Ok(res.body(reply.body))
}

//----------------------------------------------   Inventory  ----------------------------------------------------
route!(stock => Get "/inventory/{product_id}" impl InventoryLedger, CatalogReader);
pub async fn stock<B>(path: web::Path<ProductId>, api: web::Data<InventoryApi<B>>) -> Result<HttpResponse, ServerError>
where
    B: InventoryLedger + CatalogReader,
{
    let product_id = path.into_inner();
    let stock = api.current_stock(product_id).await?;
    trace!("💻️ Stock of {product_id} is {stock}");
    Ok(HttpResponse::Ok().json(StockLevel { product_id, stock }))
}

route!(stock_batch => Get "/inventory" impl InventoryLedger, CatalogReader);
/// Stock for several products at once: `/inventory?ids=1,2,3`. Products without ledger entries report zero.
pub async fn stock_batch<B>(
    query: web::Query<StockQuery>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: InventoryLedger + CatalogReader,
{
    let ids = query.product_ids()?;
    let levels = api.current_stock_batch(&ids).await?;
    let result = ids
        .into_iter()
        .map(|product_id| StockLevel { product_id, stock: levels.get(&product_id).copied().unwrap_or_default() })
        .collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(result))
}

route!(stock_ledger => Get "/inventory/{product_id}/ledger" impl InventoryLedger, CatalogReader);
/// The ledger entries of a product, newest first. Paged with `offset` and `count`.
pub async fn stock_ledger<B>(
    path: web::Path<ProductId>,
    query: web::Query<Pagination>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: InventoryLedger + CatalogReader,
{
    let product_id = path.into_inner();
    let entries = api.history(product_id, query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(entries))
}

route!(adjust_stock => Post "/inventory/{product_id}/adjust" impl InventoryLedger, CatalogReader);
/// Records an operator stock movement, such as a delivery, a stock count correction or breakage.
pub async fn adjust_stock<B>(
    req: HttpRequest,
    path: web::Path<ProductId>,
    body: web::Json<StockAdjustment>,
    api: web::Data<InventoryApi<B>>,
) -> Result<HttpResponse, ServerError>
where
    B: InventoryLedger + CatalogReader,
{
    let product_id = path.into_inner();
    let StockAdjustment { delta, reason } = body.into_inner();
    info!("💻️ Stock adjustment of {delta:+} ({reason}) for {product_id}");
    let entry = api.adjust_stock(product_id, delta, reason, actor_id(&req)).await?;
    Ok(HttpResponse::Created().json(entry))
}
