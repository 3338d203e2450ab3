mod pickup_code;

pub use pickup_code::{PickupCode, PickupCodeError, PICKUP_CODE_VERSION};
