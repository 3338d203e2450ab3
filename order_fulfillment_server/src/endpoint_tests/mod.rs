mod helpers;
mod inventory;
mod mocks;
mod orders;
mod payments;
mod redemption;
