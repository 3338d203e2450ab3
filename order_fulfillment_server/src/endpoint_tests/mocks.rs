use std::collections::HashMap;

use chrono::{DateTime, Utc};
use mockall::mock;
use order_fulfillment_engine::{
    db_types::{
        IdempotencyRecord,
        InventoryLedgerEntry,
        MenuSlot,
        MenuSlotOption,
        NewLedgerEntry,
        Order,
        OrderDraft,
        OrderId,
        OrderLine,
        Product,
        ProductId,
        StationId,
    },
    ofe_api::{inventory_objects::Pagination, order_objects::OrderQueryFilter},
    traits::{
        CatalogError,
        CatalogReader,
        CreatedOrder,
        DiscardedOrder,
        IdempotencyClaim,
        InventoryError,
        InventoryLedger,
        OrderFlowError,
        OrderManagement,
        PaymentDetails,
        RedemptionError,
        RedemptionOutcome,
        RedemptionStore,
        StatusChange,
        TransitionResult,
    },
};

mock! {
    pub Backend {}
    impl Clone for Backend {
        fn clone(&self) -> Self;
    }
    impl CatalogReader for Backend {
        async fn fetch_products(&self, ids: &[ProductId]) -> Result<Vec<Product>, CatalogError>;
        async fn fetch_slots_for_products(&self, product_ids: &[ProductId]) -> Result<Vec<MenuSlot>, CatalogError>;
        async fn fetch_slot_options(&self, slot_ids: &[i64]) -> Result<Vec<MenuSlotOption>, CatalogError>;
        async fn fetch_station_product_ids(&self, station_id: StationId) -> Result<Vec<ProductId>, CatalogError>;
    }
    impl InventoryLedger for Backend {
        async fn append(&self, entry: NewLedgerEntry) -> Result<InventoryLedgerEntry, InventoryError>;
        async fn append_many(&self, entries: Vec<NewLedgerEntry>) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;
        async fn current_stock(&self, product_id: ProductId) -> Result<i64, InventoryError>;
        async fn current_stock_batch(&self, product_ids: &[ProductId]) -> Result<HashMap<ProductId, i64>, InventoryError>;
        async fn entries_for_product(&self, product_id: ProductId, pagination: Pagination) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;
        async fn entries_between(&self, since: DateTime<Utc>, until: DateTime<Utc>) -> Result<Vec<InventoryLedgerEntry>, InventoryError>;
    }
    impl OrderManagement for Backend {
        async fn create_order(&self, draft: OrderDraft) -> Result<CreatedOrder, OrderFlowError>;
        async fn fetch_order(&self, order_id: OrderId) -> Result<Option<Order>, OrderFlowError>;
        async fn fetch_order_lines(&self, order_id: OrderId) -> Result<Vec<OrderLine>, OrderFlowError>;
        async fn search_orders(&self, filter: OrderQueryFilter) -> Result<Vec<Order>, OrderFlowError>;
        async fn change_order_status(&self, change: StatusChange) -> Result<TransitionResult, OrderFlowError>;
        async fn record_payment_details(&self, order_id: OrderId, details: PaymentDetails) -> Result<Order, OrderFlowError>;
        async fn discard_pending_order(&self, order_id: OrderId, actor: Option<String>) -> Result<Option<DiscardedOrder>, OrderFlowError>;
        async fn fetch_stale_pending_orders(&self, created_before: DateTime<Utc>) -> Result<Vec<Order>, OrderFlowError>;
    }
    impl RedemptionStore for Backend {
        async fn fetch_idempotency_record(&self, scope: &str, key: &str) -> Result<Option<IdempotencyRecord>, RedemptionError>;
        async fn redeem_for_station(&self, station_id: StationId, order_id: OrderId, claim: Option<IdempotencyClaim>) -> Result<RedemptionOutcome, RedemptionError>;
        async fn fetch_station_lines(&self, station_id: StationId, order_id: OrderId) -> Result<Vec<OrderLine>, RedemptionError>;
        async fn sweep_expired_idempotency_records(&self, now: DateTime<Utc>) -> Result<u64, RedemptionError>;
    }
}
