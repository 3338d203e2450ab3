use std::{future::Future, pin::Pin, sync::Arc};

use log::*;

use crate::events::{EventHandler, EventProducer, EventType, Handler, OrderAnnulledEvent, OrderPaidEvent, StockChangedEvent};

/// The publishing ends of every registered hook. Cheap to clone; the API structs each hold a copy.
#[derive(Default, Clone)]
pub struct EventProducers {
    pub order_paid_producer: Vec<EventProducer<OrderPaidEvent>>,
    pub order_annulled_producer: Vec<EventProducer<OrderAnnulledEvent>>,
    pub stock_changed_producer: Vec<EventProducer<StockChangedEvent>>,
}

impl EventProducers {
    /// Hands the event to every subscriber of its type.
    pub async fn publish(&self, event: EventType) {
        match event {
            EventType::OrderPaid(ev) => {
                for producer in &self.order_paid_producer {
                    trace!("📬️ Publishing order paid event for order #{}", ev.order.id.value());
                    producer.publish_event(ev.clone()).await;
                }
            },
            EventType::OrderAnnulled(ev) => {
                for producer in &self.order_annulled_producer {
                    trace!("📬️ Publishing order annulled event for order #{}", ev.order.id.value());
                    producer.publish_event(ev.clone()).await;
                }
            },
            EventType::StockChanged(ev) => {
                for producer in &self.stock_changed_producer {
                    trace!("📬️ Publishing stock change for {}: {}", ev.product_id, ev.new_stock);
                    producer.publish_event(ev).await;
                }
            },
        }
    }

    pub fn has_stock_subscribers(&self) -> bool {
        !self.stock_changed_producer.is_empty()
    }
}

pub struct EventHandlers {
    pub on_order_paid: Option<EventHandler<OrderPaidEvent>>,
    pub on_order_annulled: Option<EventHandler<OrderAnnulledEvent>>,
    pub on_stock_changed: Option<EventHandler<StockChangedEvent>>,
}

impl EventHandlers {
    pub fn new(buffer_size: usize, hooks: EventHooks) -> Self {
        let on_order_paid = hooks.on_order_paid.map(|f| EventHandler::new(buffer_size, f));
        let on_order_annulled = hooks.on_order_annulled.map(|f| EventHandler::new(buffer_size, f));
        let on_stock_changed = hooks.on_stock_changed.map(|f| EventHandler::new(buffer_size, f));
        Self { on_order_paid, on_order_annulled, on_stock_changed }
    }

    pub fn producers(&self) -> EventProducers {
        let mut result = EventProducers::default();
        if let Some(handler) = &self.on_order_paid {
            result.order_paid_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_order_annulled {
            result.order_annulled_producer.push(handler.subscribe());
        }
        if let Some(handler) = &self.on_stock_changed {
            result.stock_changed_producer.push(handler.subscribe());
        }
        result
    }

    pub async fn start_handlers(self) {
        if let Some(handler) = self.on_order_paid {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_order_annulled {
            tokio::spawn(handler.start_handler());
        }
        if let Some(handler) = self.on_stock_changed {
            tokio::spawn(handler.start_handler());
        }
    }
}

#[derive(Default, Clone)]
pub struct EventHooks {
    pub on_order_paid: Option<Handler<OrderPaidEvent>>,
    pub on_order_annulled: Option<Handler<OrderAnnulledEvent>>,
    pub on_stock_changed: Option<Handler<StockChangedEvent>>,
}

impl EventHooks {
    pub fn on_order_paid<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderPaidEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_paid = Some(Arc::new(f));
        self
    }

    pub fn on_order_annulled<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(OrderAnnulledEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_order_annulled = Some(Arc::new(f));
        self
    }

    pub fn on_stock_changed<F>(&mut self, f: F) -> &mut Self
    where F: (Fn(StockChangedEvent) -> Pin<Box<dyn Future<Output = ()> + Send>>) + Send + Sync + 'static {
        self.on_stock_changed = Some(Arc::new(f));
        self
    }
}
