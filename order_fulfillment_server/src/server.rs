use std::{future::Future, pin::Pin, time::Duration};

use actix_web::{
    dev::{Server, Service},
    http::KeepAlive,
    middleware::Logger,
    web,
    App,
    HttpServer,
};
use log::*;
use order_fulfillment_engine::{
    events::{EventHandlers, EventHooks, EventProducers},
    CheckoutApi,
    InventoryApi,
    OrderFlowApi,
    PaymentApi,
    RedemptionApi,
    SqliteDatabase,
};

use crate::{
    config::{ServerConfig, ServerOptions},
    errors::ServerError,
    helpers::{get_remote_ip, WEBHOOK_SIGNATURE_HEADER},
    maintenance_worker::{start_maintenance_worker, MaintenanceSchedule},
    middleware::HmacMiddlewareFactory,
    routes::{
        health,
        AdjustStockRoute,
        CheckoutRoute,
        OrderByIdRoute,
        PayCardRoute,
        PayCashRoute,
        PaymentWebhookRoute,
        PickupCodeRoute,
        PosOrderRoute,
        RedeemRoute,
        SearchOrdersRoute,
        StockBatchRoute,
        StockLedgerRoute,
        StockRoute,
        UpdateOrderStatusRoute,
    },
};

const EVENT_BUFFER_SIZE: usize = 25;

pub async fn run_server(config: ServerConfig) -> Result<(), ServerError> {
    let db = SqliteDatabase::new_with_url(&config.database_url, config.max_db_connections)
        .await
        .map_err(|e| ServerError::InitializeError(e.to_string()))?;
    db.migrate().await.map_err(|e| ServerError::InitializeError(e.to_string()))?;
    let handlers = EventHandlers::new(EVENT_BUFFER_SIZE, create_event_hooks());
    let producers = handlers.producers();
    handlers.start_handlers().await;
    // The worker runs until the process exits
    let _worker = start_maintenance_worker(db.clone(), producers.clone(), MaintenanceSchedule::from_config(&config));
    let srv = create_server_instance(config, db, producers)?;
    srv.await.map_err(|e| ServerError::Unspecified(e.to_string()))
}

/// The server's own subscribers. They only log; integrations (kitchen displays, stock alerts) hook in here.
pub fn create_event_hooks() -> EventHooks {
    let mut hooks = EventHooks::default();
    hooks
        .on_order_paid(|ev| {
            Box::pin(async move {
                info!("📬️ Order #{} paid ({}).", ev.order.id.value(), ev.order.total);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_order_annulled(|ev| {
            Box::pin(async move {
                info!("📬️ Order #{} {}. Its stock was returned.", ev.order.id.value(), ev.status);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        })
        .on_stock_changed(|ev| {
            Box::pin(async move {
                debug!("📬️ Stock of {} is now {} ({:+}).", ev.product_id, ev.new_stock, ev.delta);
            }) as Pin<Box<dyn Future<Output = ()> + Send>>
        });
    hooks
}

pub fn create_server_instance(
    config: ServerConfig,
    db: SqliteDatabase,
    producers: EventProducers,
) -> Result<Server, ServerError> {
    let host = config.host.clone();
    let port = config.port;
    let srv = HttpServer::new(move || {
        let checkout_api = CheckoutApi::new(db.clone(), producers.clone()).with_policy(config.checkout_policy);
        let orders_api = OrderFlowApi::new(db.clone(), producers.clone());
        let payment_api = PaymentApi::new(db.clone(), producers.clone());
        let inventory_api = InventoryApi::new(db.clone(), producers.clone());
        let redemption_api = RedemptionApi::new(db.clone()).with_idempotency_ttl(config.idempotency_ttl);
        let options = ServerOptions::from_config(&config);
        let app = App::new()
            .wrap(Logger::new("%t (%D ms) %s %a %{Host}i %U").log_target("ofe::access_log"))
            .app_data(web::Data::new(checkout_api))
            .app_data(web::Data::new(orders_api))
            .app_data(web::Data::new(payment_api))
            .app_data(web::Data::new(inventory_api))
            .app_data(web::Data::new(redemption_api))
            .app_data(web::Data::new(config.pickup_codes.clone()));
        let api_scope = web::scope("/api")
            .service(CheckoutRoute::<SqliteDatabase>::new())
            .service(PosOrderRoute::<SqliteDatabase>::new())
            .service(PayCashRoute::<SqliteDatabase>::new())
            .service(PayCardRoute::<SqliteDatabase>::new())
            .service(SearchOrdersRoute::<SqliteDatabase>::new())
            .service(OrderByIdRoute::<SqliteDatabase>::new())
            .service(UpdateOrderStatusRoute::<SqliteDatabase>::new())
            .service(PickupCodeRoute::<SqliteDatabase>::new())
            .service(RedeemRoute::<SqliteDatabase>::new())
            .service(StockBatchRoute::<SqliteDatabase>::new())
            .service(StockRoute::<SqliteDatabase>::new())
            .service(StockLedgerRoute::<SqliteDatabase>::new())
            .service(AdjustStockRoute::<SqliteDatabase>::new());
        let hmac = HmacMiddlewareFactory::new(
            WEBHOOK_SIGNATURE_HEADER,
            config.webhook.hmac_secret.clone(),
            config.webhook.hmac_checks,
        );
        let webhook_scope = web::scope("/webhook")
            .wrap(hmac)
            .wrap_fn(move |req, srv| {
                // Record where deliveries come from. Proxy headers are only trusted if configured.
                let peer = get_remote_ip(req.request(), options.use_x_forwarded_for, options.use_forwarded);
                match peer {
                    Some(ip) => info!("💻️ Webhook delivery from {ip}"),
                    None => warn!("💻️ Webhook delivery from an unknown address"),
                }
                srv.call(req)
            })
            .service(PaymentWebhookRoute::<SqliteDatabase>::new());
        app.service(health).service(api_scope).service(webhook_scope)
    })
    .keep_alive(KeepAlive::Timeout(Duration::from_secs(600)))
    .bind((host.as_str(), port))?
    .run();
    Ok(srv)
}
