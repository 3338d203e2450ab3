use std::fmt::Debug;

use log::*;

use super::{
    errors::PaymentError,
    order_flow_api::OrderFlowApi,
    payment_objects::{
        CardOutcome,
        CardPayment,
        CashReceipt,
        GatewayEvent,
        GatewayOutcome,
        PAYMENT_FAILED,
        PAYMENT_SUCCEEDED,
    },
};
use crate::{
    db_types::{Cents, Order, OrderId, OrderStatusType},
    events::EventProducers,
    traits::{InventoryLedger, OrderFlowError, OrderManagement, PaymentDetails},
};

/// Payment confirmation, from the online gateway or from a POS terminal.
///
/// All paths end in the same state machine transition as [`OrderFlowApi::transition_order`], so they share its
/// guarantees.
pub struct PaymentApi<B> {
    flow: OrderFlowApi<B>,
}

impl<B> Debug for PaymentApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PaymentApi")
    }
}

impl<B> PaymentApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { flow: OrderFlowApi::new(db, producers) }
    }

    pub fn db(&self) -> &B {
        self.flow.db()
    }
}

impl<B> PaymentApi<B>
where B: OrderManagement + InventoryLedger
{
    /// Handles a gateway callback.
    ///
    /// * `payment.succeeded` marks a pending order as paid. Gateway references are stored, and a non-empty contact
    ///   email replaces the one on the order. A repeat delivery for a paid order is acknowledged without doing
    ///   anything. A success for a cancelled or refunded order cannot be applied; it is logged and acknowledged.
    /// * `payment.failed` discards the pending order and releases its stock.
    /// * Anything else is acknowledged and ignored.
    pub async fn handle_gateway_event(&self, event: GatewayEvent) -> Result<GatewayOutcome, PaymentError> {
        let Ok(order_id) = event.client_reference.parse::<OrderId>() else {
            warn!("💳️ Gateway event {} has an unusable client reference: '{}'", event.event_type, event.client_reference);
            return Ok(GatewayOutcome::Ignored);
        };
        match event.event_type.as_str() {
            PAYMENT_SUCCEEDED => self.gateway_success(order_id, event).await,
            PAYMENT_FAILED => {
                let discarded = self.flow.discard_pending_order(order_id, None).await?;
                match discarded {
                    Some(_) => {
                        info!("💳️ Payment for order #{} failed. The order was released", order_id.value());
                        Ok(GatewayOutcome::Released(order_id))
                    },
                    None => {
                        debug!("💳️ Payment failure for order #{} ignored. It is not pending", order_id.value());
                        Ok(GatewayOutcome::Ignored)
                    },
                }
            },
            other => {
                debug!("💳️ Ignoring gateway event '{other}' for order #{}", order_id.value());
                Ok(GatewayOutcome::Ignored)
            },
        }
    }

    async fn gateway_success(&self, order_id: OrderId, event: GatewayEvent) -> Result<GatewayOutcome, PaymentError> {
        let Some(order) = self.flow.fetch_order(order_id).await? else {
            warn!("💳️ Gateway reports a payment for order #{}, which does not exist", order_id.value());
            return Ok(GatewayOutcome::Ignored);
        };
        match order.status {
            OrderStatusType::Pending => {},
            OrderStatusType::Paid => {
                warn!("💳️ Duplicate payment confirmation for order #{}", order_id.value());
                return Ok(GatewayOutcome::AlreadyPaid(order_id));
            },
            status => {
                error!(
                    "💳️ Gateway reports a payment for order #{}, but it is {status}. The payment needs to be \
                     returned manually",
                    order_id.value()
                );
                return Ok(GatewayOutcome::Ignored);
            },
        }
        let details = PaymentDetails::gateway(event.session_id, event.transaction_id, event.contact_email);
        match self.flow.apply_transition(&order, OrderStatusType::Paid, Some(details), None).await {
            Ok(result) => {
                info!("💳️ Order #{} paid through the gateway", order_id.value());
                Ok(GatewayOutcome::MarkedPaid(Box::new(result.order)))
            },
            Err(OrderFlowError::OrderStatusConflict { actual: OrderStatusType::Paid, .. }) => {
                warn!("💳️ Order #{} was marked paid by a concurrent confirmation", order_id.value());
                Ok(GatewayOutcome::AlreadyPaid(order_id))
            },
            Err(OrderFlowError::OrderStatusConflict { actual, .. }) => {
                error!("💳️ Order #{} became {actual} while its payment was being confirmed", order_id.value());
                Ok(GatewayOutcome::Ignored)
            },
            Err(e) => Err(e.into()),
        }
    }

    /// Takes a cash payment at a POS terminal. The amount received must cover the order total; the change is
    /// recorded with the payment.
    pub async fn pay_cash(
        &self,
        order_id: OrderId,
        amount_received: Cents,
        actor: Option<String>,
    ) -> Result<CashReceipt, PaymentError> {
        let order = self.payable_order(order_id).await?;
        if amount_received < order.total {
            debug!("💳️ {amount_received} is not enough to pay {} for order #{}", order.total, order_id.value());
            return Err(PaymentError::InsufficientPayment { order_id, total: order.total, received: amount_received });
        }
        let change = amount_received - order.total;
        let details = PaymentDetails::cash(amount_received, change);
        let result = self.pay(&order, details, actor).await?;
        info!("💳️ Order #{} paid in cash. {amount_received} received, {change} change", order_id.value());
        Ok(CashReceipt { order: result, amount_received, change })
    }

    /// Records a card terminal result. The processor metadata is always stored; the order is only marked as paid if
    /// the terminal reports success.
    pub async fn pay_card(
        &self,
        order_id: OrderId,
        payment: CardPayment,
        actor: Option<String>,
    ) -> Result<CardOutcome, PaymentError> {
        if payment.processor.trim().is_empty() {
            return Err(PaymentError::InvalidDetails("The card processor is required".into()));
        }
        if payment.status.trim().is_empty() {
            return Err(PaymentError::InvalidDetails("The card payment status is required".into()));
        }
        let order = self.payable_order(order_id).await?;
        let success = payment.is_success();
        let details = PaymentDetails::card(payment.processor, payment.transaction_id, payment.status);
        if success {
            let order = self.pay(&order, details, actor).await?;
            info!("💳️ Order #{} paid by card", order_id.value());
            return Ok(CardOutcome::Paid(Box::new(order)));
        }
        let order = match self.flow.db().record_payment_details(order_id, details).await {
            Ok(order) => order,
            Err(OrderFlowError::OrderNotPending(_)) => return Err(self.not_payable(order_id).await),
            Err(e) => return Err(e.into()),
        };
        info!(
            "💳️ Card payment for order #{} was not successful ({}). The order stays pending",
            order_id.value(),
            order.card_status.as_deref().unwrap_or_default()
        );
        Ok(CardOutcome::NotPaid(Box::new(order)))
    }

    async fn payable_order(&self, order_id: OrderId) -> Result<Order, PaymentError> {
        let order = self.flow.fetch_order(order_id).await?.ok_or(PaymentError::OrderNotFound(order_id))?;
        if order.status != OrderStatusType::Pending {
            return Err(PaymentError::NotPayable { order_id, status: order.status });
        }
        Ok(order)
    }

    async fn pay(&self, order: &Order, details: PaymentDetails, actor: Option<String>) -> Result<Order, PaymentError> {
        match self.flow.apply_transition(order, OrderStatusType::Paid, Some(details), actor).await {
            Ok(result) => Ok(result.order),
            Err(OrderFlowError::OrderStatusConflict { order_id, actual, .. }) => {
                Err(PaymentError::NotPayable { order_id, status: actual })
            },
            Err(e) => Err(e.into()),
        }
    }

    async fn not_payable(&self, order_id: OrderId) -> PaymentError {
        match self.flow.fetch_order(order_id).await {
            Ok(Some(order)) => PaymentError::NotPayable { order_id, status: order.status },
            Ok(None) => PaymentError::OrderNotFound(order_id),
            Err(e) => e.into(),
        }
    }
}
