//! Persistence seams for the catalog, orders and customer profiles.
//!
//! Every row read from the backend is decoded into a typed domain record
//! here; handlers never see raw rows.

mod memory;
mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::aggregates::{NewOrder, Order, OrderLineDetail, OrderStatus, Product, ProductInput, Profile};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("malformed record: {0}")]
    Decode(String),
    #[error("{0}")]
    Constraint(String),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Result of applying a provider-approved payment to an order.
#[derive(Clone, Debug, PartialEq)]
pub enum PaymentApplication {
    Applied { order: Order, sold_product_ids: Vec<i64> },
    /// The payment id was recorded by an earlier delivery.
    AlreadyProcessed,
    OrderMissing,
}

#[async_trait]
pub trait CatalogStore: Send + Sync + 'static {
    /// Newest first.
    async fn list_products(&self) -> StoreResult<Vec<Product>>;
    async fn list_by_collection(&self, collection: &str) -> StoreResult<Vec<Product>>;
    /// Case-insensitive match over name, description and collection.
    async fn search(&self, query: &str) -> StoreResult<Vec<Product>>;
    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>>;
    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product>;
    async fn update_product(&self, id: i64, input: &ProductInput) -> StoreResult<Option<Product>>;
    async fn delete_product(&self, id: i64) -> StoreResult<bool>;
}

#[async_trait]
pub trait OrderStore: Send + Sync + 'static {
    /// Persists the order row and all of its lines atomically.
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order>;
    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn list_orders(&self) -> StoreResult<Vec<Order>>;
    async fn list_orders_for_account(&self, user_id: Uuid) -> StoreResult<Vec<Order>>;
    async fn order_lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLineDetail>>;
    async fn set_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>>;
    /// Records `payment_id`, marks the order paid and its products sold, in one unit.
    async fn apply_payment(&self, payment_id: &str, order_id: Uuid) -> StoreResult<PaymentApplication>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>>;
    async fn upsert_display_name(&self, user_id: Uuid, full_name: &str) -> StoreResult<Profile>;
}

/// Statuses a provider-approved payment may overwrite with `paid`.
pub(crate) fn payable(status: OrderStatus) -> bool {
    matches!(status, OrderStatus::Pending | OrderStatus::Paid | OrderStatus::Cancelled)
}
