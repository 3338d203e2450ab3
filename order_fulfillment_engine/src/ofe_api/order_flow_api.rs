use std::fmt::Debug;

use chrono::{Duration, Utc};
use log::*;

use super::{order_objects::OrderWithLines, stock_notifier::notify_stock_changes};
use crate::{
    db_types::{LedgerReason, Order, OrderId, OrderStatusType},
    events::{EventProducers, EventType, OrderAnnulledEvent, OrderPaidEvent},
    ofe_api::order_objects::OrderQueryFilter,
    traits::{
        DiscardedOrder,
        InventoryLedger,
        OrderFlowError,
        OrderManagement,
        PaymentDetails,
        StatusChange,
        TransitionResult,
    },
};

/// `OrderFlowApi` owns the order state machine. Every status change, whoever initiates it, goes through
/// [`Self::transition_order`] or the payment-specific variant used by [`crate::PaymentApi`].
pub struct OrderFlowApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B: Clone> Clone for OrderFlowApi<B> {
    fn clone(&self) -> Self {
        Self { db: self.db.clone(), producers: self.producers.clone() }
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

/// Which transitions are allowed, and the ledger reversal each one implies.
///
/// | From \ To | Pending | Paid | Cancelled        | Refunded   |
/// |-----------|---------|------|------------------|------------|
/// | Pending   | Err     | Ok   | Ok, cancellation | Err        |
/// | Paid      | Err     | Err  | Ok, cancellation | Ok, refund |
/// | Cancelled | Err     | Err  | Err              | Err        |
/// | Refunded  | Err     | Err  | Err              | Err        |
///
/// Moving to the same status is not a transition, and is an error too.
///
/// Returns `None` if the transition is not allowed, otherwise the reversal to apply (if any).
pub fn transition_rule(from: OrderStatusType, to: OrderStatusType) -> Option<Option<LedgerReason>> {
    use OrderStatusType::*;
    match (from, to) {
        (Pending, Paid) => Some(None),
        (Pending, Cancelled) | (Paid, Cancelled) => Some(Some(LedgerReason::Cancellation)),
        (Paid, Refunded) => Some(Some(LedgerReason::Refund)),
        _ => None,
    }
}

impl<B> OrderFlowApi<B>
where B: OrderManagement + InventoryLedger
{
    pub async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError> {
        self.db.fetch_order(order_id).await
    }

    pub async fn fetch_order_with_lines(&self, order_id: OrderId) -> Result<Option<OrderWithLines>, OrderFlowError> {
        let Some(order) = self.db.fetch_order(order_id).await? else {
            return Ok(None);
        };
        let lines = self.db.fetch_order_lines(order_id).await?;
        Ok(Some(OrderWithLines { order, lines }))
    }

    pub async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError> {
        trace!("🔄️ Searching orders. {filter}");
        self.db.search_orders(filter).await
    }

    /// Changes the status of an order.
    ///
    /// The allowed moves are given in [`transition_rule`]. Anything else fails with
    /// [`OrderFlowError::InvalidTransition`] and the order is left untouched.
    ///
    /// ### Moving to `Paid`
    /// No stock moves; it was reserved when the order was created. The payment method is recorded as `manual`. An
    /// `OrderPaidEvent` is published.
    ///
    /// ### Moving to `Cancelled` or `Refunded`
    /// In the same transaction as the status change, one ledger entry per product returns the quantity that the
    /// order's simple and component lines reserved. Bundle lines hold no stock and are skipped. Afterwards, an
    /// `OrderAnnulledEvent` and a stock change notification per product are published.
    ///
    /// ## Returns
    /// The updated order.
    pub async fn transition_order(
        &self,
        order_id: OrderId,
        target: OrderStatusType,
        actor: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        let order = self.db.fetch_order(order_id).await?.ok_or(OrderFlowError::OrderNotFound(order_id))?;
        let payment = (target == OrderStatusType::Paid).then(PaymentDetails::manual);
        let result = self.apply_transition(&order, target, payment, actor).await?;
        Ok(result.order)
    }

    /// Applies a state machine transition starting from `order.status`. If the order changed status in the meantime,
    /// the call fails with [`OrderFlowError::OrderStatusConflict`] and nothing is written.
    pub(crate) async fn apply_transition(
        &self,
        order: &Order,
        target: OrderStatusType,
        payment: Option<PaymentDetails>,
        actor: Option<String>,
    ) -> Result<TransitionResult, OrderFlowError> {
        let from = order.status;
        let reversal = transition_rule(from, target).ok_or_else(|| {
            debug!("🔄️ Order #{} cannot move from {from} to {target}", order.id.value());
            OrderFlowError::InvalidTransition { from, to: target }
        })?;
        let mut change = StatusChange::new(order.id, from, target).with_actor(actor);
        if let Some(reason) = reversal {
            change = change.with_reversal(reason);
        }
        if let Some(payment) = payment {
            change = change.with_payment(payment);
        }
        let result = self.db.change_order_status(change).await?;
        info!("🔄️ Order #{} is now {target} (was {from})", order.id.value());
        self.after_transition(&result).await;
        Ok(result)
    }

    async fn after_transition(&self, result: &TransitionResult) {
        match result.order.status {
            OrderStatusType::Paid => {
                let event = OrderPaidEvent::new(result.order.clone());
                self.producers.publish(EventType::OrderPaid(event)).await;
            },
            OrderStatusType::Cancelled | OrderStatusType::Refunded => {
                let event = OrderAnnulledEvent::new(result.order.clone());
                self.producers.publish(EventType::OrderAnnulled(event)).await;
                notify_stock_changes(&self.db, &self.producers, &result.reversals).await;
            },
            OrderStatusType::Pending => {},
        }
    }

    /// Removes a pending order entirely, releasing its reservation with reason `correction`. Used for abandoned and
    /// superseded checkouts, and for failed gateway payments.
    ///
    /// Returns `None`, and does nothing, if the order does not exist or is not pending.
    pub async fn discard_pending_order(
        &self,
        order_id: OrderId,
        actor: Option<String>,
    ) -> Result<Option<DiscardedOrder>, OrderFlowError> {
        let discarded = self.db.discard_pending_order(order_id, actor).await?;
        match &discarded {
            Some(d) => {
                info!("🔄️ Pending order #{} discarded", order_id.value());
                notify_stock_changes(&self.db, &self.producers, &d.releases).await;
            },
            None => debug!("🔄️ Order #{} is not pending. Nothing was discarded", order_id.value()),
        }
        Ok(discarded)
    }

    /// Cancels every pending order created more than `older_than` ago. Orders that were paid (or otherwise moved on)
    /// while this was running are skipped.
    pub async fn cancel_stale_pending_orders(&self, older_than: Duration) -> Result<Vec<Order>, OrderFlowError> {
        let cutoff = Utc::now() - older_than;
        let stale = self.db.fetch_stale_pending_orders(cutoff).await?;
        let mut cancelled = Vec::with_capacity(stale.len());
        for order in stale {
            match self.apply_transition(&order, OrderStatusType::Cancelled, None, None).await {
                Ok(result) => cancelled.push(result.order),
                Err(OrderFlowError::OrderStatusConflict { order_id, actual, .. }) => {
                    debug!("🔄️ Stale order #{} became {actual} before it could be cancelled", order_id.value());
                },
                Err(e) => return Err(e),
            }
        }
        if !cancelled.is_empty() {
            info!("🔄️ {} stale pending orders cancelled", cancelled.len());
        }
        Ok(cancelled)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transition_graph() {
        use OrderStatusType::*;
        let allowed = [(Pending, Paid), (Pending, Cancelled), (Paid, Cancelled), (Paid, Refunded)];
        for from in OrderStatusType::all() {
            for to in OrderStatusType::all() {
                assert_eq!(transition_rule(from, to).is_some(), allowed.contains(&(from, to)), "{from} -> {to}");
            }
        }
        assert_eq!(transition_rule(Pending, Paid), Some(None));
        assert_eq!(transition_rule(Paid, Refunded), Some(Some(LedgerReason::Refund)));
        assert_eq!(transition_rule(Pending, Cancelled), Some(Some(LedgerReason::Cancellation)));
    }
}
