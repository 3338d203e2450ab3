use std::{
    collections::{BTreeSet, HashMap, HashSet},
    fmt::Debug,
};

use log::*;

use super::{
    checkout_objects::{CartItem, CheckoutPolicy, CheckoutRequest, PreparedOrder},
    errors::CheckoutError,
    order_flow_api::OrderFlowApi,
    stock_notifier::notify_stock_changes,
};
use crate::{
    db_types::{
        Cents,
        DraftItem,
        MenuSlot,
        NewOrder,
        NewOrderLine,
        OrderDraft,
        OrderStatusType,
        Origin,
        Product,
        ProductId,
        ProductType,
    },
    events::EventProducers,
    ofe_api::order_objects::OrderQueryFilter,
    traits::{CatalogReader, InventoryLedger, OrderManagement},
};

/// Turns carts into pending orders.
///
/// Everything the cart refers to is resolved from the catalog in a handful of batch reads, and the cart is fully
/// validated before anything is written. The order, its lines and the stock reservations are then created in one
/// transaction.
pub struct CheckoutApi<B> {
    db: B,
    producers: EventProducers,
    policy: CheckoutPolicy,
}

impl<B> Debug for CheckoutApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CheckoutApi ({:?})", self.policy)
    }
}

impl<B> CheckoutApi<B> {
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers, policy: CheckoutPolicy::default() }
    }

    pub fn with_policy(mut self, policy: CheckoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &CheckoutPolicy {
        &self.policy
    }

    pub fn db(&self) -> &B {
        &self.db
    }
}

impl<B> CheckoutApi<B>
where B: CatalogReader + OrderManagement + InventoryLedger
{
    /// Validates the cart, prices it from the catalog, and creates a pending order that reserves its stock.
    ///
    /// If the request carries a payment attempt id, any other pending order of the same attempt is discarded after
    /// the new order has been created.
    pub async fn prepare_order(
        &self,
        request: CheckoutRequest,
        origin: Origin,
        actor: Option<String>,
    ) -> Result<PreparedOrder, CheckoutError> {
        validate_quantities(&request.items)?;
        let snapshot = self.load_catalog(&request.items).await?;
        let (total, items) = assemble_items(&request.items, &snapshot, &self.policy)?;
        let mut order = NewOrder::new(total, origin);
        order.customer_id = request.customer_id.filter(|s| !s.trim().is_empty());
        order.contact_email = request.contact_email.filter(|s| !s.trim().is_empty());
        order.payment_attempt_id = request.payment_attempt_id.filter(|s| !s.trim().is_empty());
        let attempt_id = order.payment_attempt_id.clone();
        let draft = OrderDraft { order, items, actor: actor.clone(), enforce_stock: self.policy.enforce_stock };
        trace!("🛒️ Creating order with {} reservations", draft.reservation_count());
        let created = self.db.create_order(draft).await?;
        info!(
            "🛒️ Order #{} created from {origin}. Total {}. {} lines",
            created.order.id.value(),
            created.order.total,
            created.lines.len()
        );
        notify_stock_changes(&self.db, &self.producers, &created.reservations).await;
        let mut prepared = PreparedOrder::new(&created.order, created.lines);
        if let Some(attempt_id) = attempt_id {
            let flow = OrderFlowApi::new(self.db.clone(), self.producers.clone());
            let filter = OrderQueryFilter::default()
                .with_payment_attempt_id(attempt_id.as_str())
                .with_status(OrderStatusType::Pending);
            for other in flow.search_orders(filter).await? {
                if other.id == prepared.order_id {
                    continue;
                }
                if flow.discard_pending_order(other.id, actor.clone()).await?.is_some() {
                    debug!("🛒️ Order #{} was superseded by #{}", other.id.value(), prepared.order_id.value());
                    prepared.superseded.push(other.id);
                }
            }
        }
        Ok(prepared)
    }

    async fn load_catalog(&self, cart: &[CartItem]) -> Result<CatalogSnapshot, CheckoutError> {
        let ids = cart
            .iter()
            .flat_map(|item| std::iter::once(item.product_id).chain(item.slots.iter().map(|s| s.product_id)))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();
        let products = self.db.fetch_products(&ids).await?;
        let bundle_ids = products
            .iter()
            .filter(|p| p.product_type == ProductType::Bundle)
            .map(|p| p.id)
            .collect::<Vec<_>>();
        let slots = self.db.fetch_slots_for_products(&bundle_ids).await?;
        let slot_ids = slots.iter().map(|s| s.id).collect::<Vec<_>>();
        let options = self.db.fetch_slot_options(&slot_ids).await?;
        trace!(
            "🛒️ Catalog loaded: {} products, {} slots, {} slot options",
            products.len(),
            slots.len(),
            options.len()
        );
        Ok(CatalogSnapshot {
            products: products.into_iter().map(|p| (p.id, p)).collect(),
            slots: slots.into_iter().map(|s| (s.id, s)).collect(),
            options: options.into_iter().map(|o| (o.slot_id, o.option_product_id)).collect(),
        })
    }
}

/// The slice of the catalog that a cart refers to.
#[derive(Debug, Clone, Default)]
pub(crate) struct CatalogSnapshot {
    pub products: HashMap<ProductId, Product>,
    pub slots: HashMap<i64, MenuSlot>,
    pub options: HashSet<(i64, ProductId)>,
}

impl CatalogSnapshot {
    fn active_product(&self, id: ProductId) -> Result<&Product, CheckoutError> {
        let product = self.products.get(&id).ok_or(CheckoutError::UnknownProduct(id))?;
        if !product.is_active {
            return Err(CheckoutError::InactiveProduct(id));
        }
        Ok(product)
    }
}

fn validate_quantities(cart: &[CartItem]) -> Result<(), CheckoutError> {
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }
    match cart.iter().find(|item| item.quantity <= 0) {
        Some(item) => Err(CheckoutError::InvalidQuantity { product_id: item.product_id, quantity: item.quantity }),
        None => Ok(()),
    }
}

/// Builds the draft lines for the cart and computes the order total from catalog prices, enforcing the payment
/// ceilings. Nothing is written here, so any error leaves no trace.
pub(crate) fn assemble_items(
    cart: &[CartItem],
    catalog: &CatalogSnapshot,
    policy: &CheckoutPolicy,
) -> Result<(Cents, Vec<DraftItem>), CheckoutError> {
    let mut total = Cents::default();
    let mut items = Vec::with_capacity(cart.len());
    for item in cart {
        let product = catalog.active_product(item.product_id)?;
        let draft = match product.product_type {
            ProductType::Simple => {
                if !item.slots.is_empty() {
                    return Err(CheckoutError::SlotsNotAllowed(product.id));
                }
                DraftItem { line: NewOrderLine::simple(product, item.quantity), components: Vec::new() }
            },
            ProductType::Bundle => {
                let components = assemble_components(product, item, catalog)?;
                DraftItem { line: NewOrderLine::bundle(product, item.quantity), components }
            },
        };
        let line_total = product.price.checked_mul(item.quantity).ok_or(CheckoutError::AmountOverflow)?;
        if let Some(ceiling) = policy.line_ceiling {
            if line_total > ceiling {
                return Err(CheckoutError::LineCeilingExceeded { product_id: product.id, amount: line_total, ceiling });
            }
        }
        total = total.checked_add(line_total).ok_or(CheckoutError::AmountOverflow)?;
        items.push(draft);
    }
    if let Some(ceiling) = policy.order_ceiling {
        if total > ceiling {
            return Err(CheckoutError::OrderCeilingExceeded { total, ceiling });
        }
    }
    Ok((total, items))
}

fn assemble_components(
    bundle: &Product,
    item: &CartItem,
    catalog: &CatalogSnapshot,
) -> Result<Vec<NewOrderLine>, CheckoutError> {
    let mut seen = HashSet::new();
    let mut chosen = Vec::with_capacity(item.slots.len());
    for selection in &item.slots {
        let slot = catalog
            .slots
            .get(&selection.slot_id)
            .filter(|s| s.product_id == bundle.id)
            .ok_or(CheckoutError::InvalidSlot { product_id: bundle.id, slot_id: selection.slot_id })?;
        if !seen.insert(slot.id) {
            return Err(CheckoutError::DuplicateSlot { product_id: bundle.id, slot_id: slot.id });
        }
        if !catalog.options.contains(&(slot.id, selection.product_id)) {
            return Err(CheckoutError::OptionNotAllowed { slot_id: slot.id, option: selection.product_id });
        }
        let option = catalog.active_product(selection.product_id)?;
        if option.product_type != ProductType::Simple {
            return Err(CheckoutError::OptionNotAllowed { slot_id: slot.id, option: option.id });
        }
        chosen.push((slot, option));
    }
    chosen.sort_by_key(|(slot, _)| (slot.sequence, slot.id));
    Ok(chosen.into_iter().map(|(slot, option)| NewOrderLine::component(option, slot, item.quantity)).collect())
}
