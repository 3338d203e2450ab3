//! Fire-and-forget notifications.
//!
//! Components publish events after their database transaction has committed. Publishing never fails from the point
//! of view of the publisher: a full or closed channel is logged and the event is dropped.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
