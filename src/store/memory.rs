use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{payable, CatalogStore, OrderStore, PaymentApplication, ProfileStore, StoreError, StoreResult};
use crate::domain::aggregates::{
    NewOrder, Order, OrderLine, OrderLineDetail, OrderStatus, Product, ProductInput, Profile,
};

#[derive(Default)]
struct Tables {
    products: HashMap<i64, Product>,
    orders: HashMap<Uuid, Order>,
    order_items: Vec<OrderLine>,
    profiles: HashMap<Uuid, Profile>,
    processed_payments: HashSet<String>,
}

/// Process-local store used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    next_product_id: Arc<AtomicI64>,
    next_line_id: Arc<AtomicI64>,
}

fn newest_first(mut products: Vec<Product>) -> Vec<Product> {
    products.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
    products
}

fn orders_newest_first(mut orders: Vec<Order>) -> Vec<Order> {
    orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    orders
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Inserts a product as-is, keeping its id; used for seeding.
    pub async fn insert_product(&self, product: Product) {
        self.next_product_id.fetch_max(product.id, Ordering::SeqCst);
        self.tables.write().await.products.insert(product.id, product);
    }

    pub async fn processed_payment_count(&self) -> usize { self.tables.read().await.processed_payments.len() }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        Ok(newest_first(self.tables.read().await.products.values().cloned().collect()))
    }

    async fn list_by_collection(&self, collection: &str) -> StoreResult<Vec<Product>> {
        let tables = self.tables.read().await;
        Ok(newest_first(
            tables.products.values().filter(|p| p.collection.as_deref() == Some(collection)).cloned().collect(),
        ))
    }

    async fn search(&self, query: &str) -> StoreResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() { return Ok(vec![]); }
        let tables = self.tables.read().await;
        Ok(newest_first(tables.products.values().filter(|p| p.matches(query)).cloned().collect()))
    }

    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        Ok(self.tables.read().await.products.get(&id).cloned())
    }

    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product> {
        let product = Product {
            id: self.next_product_id.fetch_add(1, Ordering::SeqCst) + 1,
            name: input.name.clone(),
            description: input.description.clone(),
            price: input.price,
            image_url: input.image_url.clone(),
            is_sold: false,
            collection: input.collection.clone(),
            created_at: Utc::now(),
        };
        self.tables.write().await.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: i64, input: &ProductInput) -> StoreResult<Option<Product>> {
        let mut tables = self.tables.write().await;
        let Some(product) = tables.products.get_mut(&id) else { return Ok(None) };
        product.name = input.name.clone();
        product.description = input.description.clone();
        product.price = input.price;
        if input.image_url.is_some() { product.image_url = input.image_url.clone(); }
        product.collection = input.collection.clone();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        if tables.order_items.iter().any(|l| l.product_id == id) {
            return Err(StoreError::Constraint(format!("product {id} is referenced by existing orders")));
        }
        Ok(tables.products.remove(&id).is_some())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn create_order(&self, new: &NewOrder) -> StoreResult<Order> {
        let order = Order {
            id: new.id,
            customer_name: new.customer_name.clone(),
            customer_email: new.customer_email.clone(),
            total_price: new.total_price,
            status: OrderStatus::Pending,
            user_id: new.user_id,
            created_at: Utc::now(),
        };
        let lines = new
            .lines
            .iter()
            .map(|l| -> StoreResult<OrderLine> {
                Ok(OrderLine {
                    id: self.next_line_id.fetch_add(1, Ordering::SeqCst) + 1,
                    order_id: new.id,
                    product_id: l.product_id,
                    quantity: i32::try_from(l.quantity.value())
                        .map_err(|_| StoreError::Constraint(format!("quantity out of range for product {}", l.product_id)))?,
                    price: l.unit_price,
                })
            })
            .collect::<StoreResult<Vec<_>>>()?;

        // one write guard for both tables so readers never see a partial order
        let mut tables = self.tables.write().await;
        if tables.orders.contains_key(&order.id) {
            return Err(StoreError::Constraint(format!("order {} already exists", order.id)));
        }
        tables.orders.insert(order.id, order.clone());
        tables.order_items.extend(lines);
        Ok(order)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.tables.read().await.orders.get(&id).cloned())
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        Ok(orders_newest_first(self.tables.read().await.orders.values().cloned().collect()))
    }

    async fn list_orders_for_account(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let tables = self.tables.read().await;
        Ok(orders_newest_first(tables.orders.values().filter(|o| o.user_id == Some(user_id)).cloned().collect()))
    }

    async fn order_lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLineDetail>> {
        let tables = self.tables.read().await;
        Ok(tables
            .order_items
            .iter()
            .filter(|l| l.order_id == order_id)
            .map(|l| {
                let product = tables.products.get(&l.product_id);
                OrderLineDetail {
                    line: l.clone(),
                    product_name: product.map(|p| p.name.clone()),
                    product_image_url: product.and_then(|p| p.image_url.clone()),
                }
            })
            .collect())
    }

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        let mut tables = self.tables.write().await;
        Ok(tables.orders.get_mut(&id).map(|o| {
            o.status = status;
            o.clone()
        }))
    }

    async fn apply_payment(&self, payment_id: &str, order_id: Uuid) -> StoreResult<PaymentApplication> {
        let mut tables = self.tables.write().await;
        if !tables.orders.contains_key(&order_id) { return Ok(PaymentApplication::OrderMissing); }
        if !tables.processed_payments.insert(payment_id.to_string()) {
            return Ok(PaymentApplication::AlreadyProcessed);
        }

        let mut product_ids: Vec<i64> =
            tables.order_items.iter().filter(|l| l.order_id == order_id).map(|l| l.product_id).collect();
        product_ids.sort_unstable();
        product_ids.dedup();

        let mut sold_product_ids = Vec::with_capacity(product_ids.len());
        for id in product_ids {
            if let Some(p) = tables.products.get_mut(&id) {
                p.is_sold = true;
                sold_product_ids.push(id);
            }
        }

        let Some(order) = tables.orders.get_mut(&order_id) else { return Ok(PaymentApplication::OrderMissing) };
        if payable(order.status) { order.status = OrderStatus::Paid; }
        Ok(PaymentApplication::Applied { order: order.clone(), sold_product_ids })
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(self.tables.read().await.profiles.get(&user_id).cloned())
    }

    async fn upsert_display_name(&self, user_id: Uuid, full_name: &str) -> StoreResult<Profile> {
        let profile = Profile { id: user_id, full_name: Some(full_name.to_string()), updated_at: Utc::now() };
        self.tables.write().await.profiles.insert(user_id, profile.clone());
        Ok(profile)
    }
}
