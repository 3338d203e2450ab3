use std::time::Duration;

use cucumber::{then, when};
use order_fulfillment_engine::{
    db_types::{Cents, OrderStatusType, Origin},
    ofe_api::{
        checkout_objects::{CartItem, CheckoutRequest},
        payment_objects::GatewayEvent,
    },
    CheckoutApi,
    InventoryLedger,
    OrderFlowApi,
    OrderManagement,
    PaymentApi,
    RedemptionApi,
};

use crate::cucumber::FulfillmentWorld;

/// Parses "2 Burger, 1 Cola" into cart items
fn parse_cart(world: &FulfillmentWorld, cart: &str) -> Vec<CartItem> {
    cart.split(',')
        .map(|item| {
            let (qty, name) = item.trim().split_once(' ').expect("Items look like '2 Burger'");
            let qty = qty.parse::<i64>().expect("Quantity must be an integer");
            CartItem::new(world.product(name.trim()), qty)
        })
        .collect()
}

async fn place_order(world: &mut FulfillmentWorld, items: Vec<CartItem>, origin: Origin) {
    let api = CheckoutApi::new(world.db().clone(), Default::default());
    match api.prepare_order(CheckoutRequest::new(items), origin, None).await {
        Ok(prepared) => {
            world.last_order = Some(prepared.order_id);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "a {word} customer orders {string}")]
async fn order_items(world: &mut FulfillmentWorld, origin: String, cart: String) {
    let origin = origin.parse::<Origin>().expect("Invalid origin");
    let items = parse_cart(world, &cart);
    place_order(world, items, origin).await;
}

#[when(expr = "a web customer orders a Menu with {word} and {word}")]
async fn order_menu(world: &mut FulfillmentWorld, side: String, drink: String) {
    let catalog = world.system().catalog;
    let item = CartItem::new(catalog.menu, 1)
        .with_slot(catalog.side_slot, world.product(&side))
        .with_slot(catalog.drink_slot, world.product(&drink));
    place_order(world, vec![item], Origin::Web).await;
}

#[when(expr = "the customer pays {int} in cash")]
async fn pay_cash(world: &mut FulfillmentWorld, amount: i64) {
    let api = PaymentApi::new(world.db().clone(), Default::default());
    match api.pay_cash(world.last_order(), Cents::from(amount), Some("till-1".into())).await {
        Ok(receipt) => {
            world.last_change = Some(receipt.change);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "the gateway reports {word} for the order")]
async fn gateway_event(world: &mut FulfillmentWorld, event_type: String) {
    let api = PaymentApi::new(world.db().clone(), Default::default());
    let event = GatewayEvent::new(event_type, world.last_order().value().to_string());
    api.handle_gateway_event(event).await.expect("Gateway events are always acknowledged");
}

#[when(expr = "the order is moved to {word}")]
async fn transition(world: &mut FulfillmentWorld, status: String) {
    let target = status.parse::<OrderStatusType>().expect("Invalid status");
    let api = OrderFlowApi::new(world.db().clone(), Default::default());
    match api.transition_order(world.last_order(), target, Some("manager".into())).await {
        Ok(_) => world.last_error = None,
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "station {word} redeems the order with key {word}")]
async fn redeem_with_key(world: &mut FulfillmentWorld, station: String, key: String) {
    redeem(world, station, Some(key)).await;
}

#[when(expr = "station {word} redeems the order")]
async fn redeem_without_key(world: &mut FulfillmentWorld, station: String) {
    redeem(world, station, None).await;
}

async fn redeem(world: &mut FulfillmentWorld, station: String, key: Option<String>) {
    let api = RedemptionApi::new(world.db().clone());
    let station = world.station(&station);
    match api.redeem(station, world.last_order(), key.as_deref()).await {
        Ok(reply) => {
            world.replies.push(reply);
            world.last_error = None;
        },
        Err(e) => world.last_error = Some(e.to_string()),
    }
}

#[when(expr = "I pause for {int}ms")]
async fn pause(_world: &mut FulfillmentWorld, ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[then(expr = "the order is {word}")]
async fn check_status(world: &mut FulfillmentWorld, status: String) {
    let expected = status.parse::<OrderStatusType>().expect("Invalid status");
    let order = world.db().fetch_order(world.last_order()).await.unwrap().expect("Order does not exist");
    assert_eq!(order.status, expected);
}

#[then("the order no longer exists")]
async fn check_order_gone(world: &mut FulfillmentWorld) {
    let order = world.db().fetch_order(world.last_order()).await.unwrap();
    assert!(order.is_none(), "Order still exists");
}

#[then(expr = "the order total is {int}")]
async fn check_total(world: &mut FulfillmentWorld, total: i64) {
    let order = world.db().fetch_order(world.last_order()).await.unwrap().expect("Order does not exist");
    assert_eq!(order.total, Cents::from(total));
}

#[then(expr = "the stock of {word} is {int}")]
async fn check_stock(world: &mut FulfillmentWorld, product: String, stock: i64) {
    let product_id = world.product(&product);
    let actual = world.db().current_stock(product_id).await.unwrap();
    assert_eq!(actual, stock, "Stock of {product} is {actual}");
}

#[then(expr = "the change given is {int}")]
async fn check_change(world: &mut FulfillmentWorld, change: i64) {
    assert_eq!(world.last_change, Some(Cents::from(change)));
}

#[then(expr = "the call fails with {string}")]
async fn check_error(world: &mut FulfillmentWorld, message: String) {
    let err = world.last_error.as_ref().expect("The last call succeeded");
    assert!(err.contains(&message), "'{err}' does not contain '{message}'");
}

#[then(expr = "the station redeemed {int} of {int} lines")]
async fn check_redeemed(world: &mut FulfillmentWorld, redeemed: u64, matched: u64) {
    let reply = world.replies.last().expect("No redemption reply");
    let receipt = reply.receipt().expect("Invalid receipt");
    assert_eq!((receipt.redeemed, receipt.matched), (redeemed, matched));
}

#[then("the last reply is a replay of the one before")]
async fn check_replay(world: &mut FulfillmentWorld) {
    let n = world.replies.len();
    assert!(n >= 2, "Need two replies to compare");
    assert!(world.replies[n - 1].replayed);
    assert_eq!(world.replies[n - 1].body, world.replies[n - 2].body);
}
