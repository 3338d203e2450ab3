use cucumber::given;

use crate::cucumber::{fulfillment_world::FulfillmentSystem, FulfillmentWorld};

#[given("a fresh install with the demo catalog")]
async fn fresh_database(world: &mut FulfillmentWorld) {
    let system = FulfillmentSystem::new().await;
    world.system = Some(system);
}
