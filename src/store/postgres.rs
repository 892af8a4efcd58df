use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{postgres::PgPoolOptions, PgPool};
use uuid::Uuid;

use super::{payable, CatalogStore, OrderStore, PaymentApplication, ProfileStore, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::domain::aggregates::{NewOrder, Order, OrderLineDetail, OrderStatus, Product, ProductInput, Profile};

const PRODUCT_COLUMNS: &str = "id, name, description, price, image_url, is_sold, collection, created_at";
const ORDER_COLUMNS: &str = "id, customer_name, customer_email, total_price, status, user_id, created_at";

#[derive(Clone)]
pub struct PgStore { pool: PgPool }

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    customer_name: String,
    customer_email: String,
    total_price: Decimal,
    status: String,
    user_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = StoreError;
    fn try_from(r: OrderRow) -> Result<Self, Self::Error> {
        let status = r.status.parse::<OrderStatus>().map_err(|e| StoreError::Decode(format!("order {}: {e}", r.id)))?;
        Ok(Order {
            id: r.id,
            customer_name: r.customer_name,
            customer_email: r.customer_email,
            total_price: r.total_price,
            status,
            user_id: r.user_id,
            created_at: r.created_at,
        })
    }
}

fn decode_orders(rows: Vec<OrderRow>) -> StoreResult<Vec<Order>> {
    rows.into_iter().map(Order::try_from).collect()
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self { Self { pool } }

    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new().max_connections(config.max_connections).connect(&config.url).await?;
        sqlx::migrate!("./migrations").run(&pool).await.map_err(|e| StoreError::Database(e.into()))?;
        tracing::info!(max_connections = config.max_connections, "database connection established");
        Ok(Self::new(pool))
    }

}

#[async_trait]
impl CatalogStore for PgStore {
    async fn list_products(&self) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_by_collection(&self, collection: &str) -> StoreResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE collection = $1 ORDER BY created_at DESC, id DESC");
        Ok(sqlx::query_as::<_, Product>(&sql).bind(collection).fetch_all(&self.pool).await?)
    }

    async fn search(&self, query: &str) -> StoreResult<Vec<Product>> {
        let query = query.trim();
        if query.is_empty() { return Ok(vec![]); }
        let pattern = format!("%{}%", query.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_"));
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products
             WHERE name ILIKE $1 OR description ILIKE $1 OR collection ILIKE $1
             ORDER BY created_at DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, Product>(&sql).bind(pattern).fetch_all(&self.pool).await?)
    }

    async fn get_product(&self, id: i64) -> StoreResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1");
        Ok(sqlx::query_as::<_, Product>(&sql).bind(id).fetch_optional(&self.pool).await?)
    }

    async fn create_product(&self, input: &ProductInput) -> StoreResult<Product> {
        let sql = format!(
            "INSERT INTO products (name, description, price, image_url, collection)
             VALUES ($1, $2, $3, $4, $5) RETURNING {PRODUCT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(&input.name).bind(&input.description).bind(input.price).bind(&input.image_url).bind(&input.collection)
            .fetch_one(&self.pool).await?)
    }

    async fn update_product(&self, id: i64, input: &ProductInput) -> StoreResult<Option<Product>> {
        // a missing image_url keeps the current image
        let sql = format!(
            "UPDATE products SET name = $2, description = $3, price = $4,
                 image_url = COALESCE($5, image_url), collection = $6
             WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
        );
        Ok(sqlx::query_as::<_, Product>(&sql)
            .bind(id).bind(&input.name).bind(&input.description).bind(input.price).bind(&input.image_url).bind(&input.collection)
            .fetch_optional(&self.pool).await?)
    }

    async fn delete_product(&self, id: i64) -> StoreResult<bool> {
        let referenced: (bool,) = sqlx::query_as("SELECT EXISTS (SELECT 1 FROM order_items WHERE product_id = $1)")
            .bind(id).fetch_one(&self.pool).await?;
        if referenced.0 {
            return Err(StoreError::Constraint(format!("product {id} is referenced by existing orders")));
        }
        let res = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn create_order(&self, order: &NewOrder) -> StoreResult<Order> {
        let product_ids: Vec<i64> = order.lines.iter().map(|l| l.product_id).collect();
        let quantities = order
            .lines
            .iter()
            .map(|l| {
                i32::try_from(l.quantity.value())
                    .map_err(|_| StoreError::Constraint(format!("quantity out of range for product {}", l.product_id)))
            })
            .collect::<StoreResult<Vec<i32>>>()?;
        let prices: Vec<Decimal> = order.lines.iter().map(|l| l.unit_price).collect();

        let mut tx = self.pool.begin().await?;

        let sql = format!(
            "INSERT INTO orders (id, customer_name, customer_email, total_price, status, user_id)
             VALUES ($1, $2, $3, $4, 'pending', $5) RETURNING {ORDER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(order.id).bind(&order.customer_name).bind(&order.customer_email).bind(order.total_price).bind(order.user_id)
            .fetch_one(&mut *tx).await?;

        sqlx::query(
            "INSERT INTO order_items (order_id, product_id, quantity, price)
             SELECT $1, unnest($2::bigint[]), unnest($3::int[]), unnest($4::numeric[])",
        )
        .bind(order.id).bind(&product_ids).bind(&quantities).bind(&prices)
        .execute(&mut *tx).await?;

        tx.commit().await?;
        Order::try_from(row)
    }

    async fn get_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, OrderRow>(&sql).bind(id).fetch_optional(&self.pool).await?.map(Order::try_from).transpose()
    }

    async fn list_orders(&self) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC");
        decode_orders(sqlx::query_as::<_, OrderRow>(&sql).fetch_all(&self.pool).await?)
    }

    async fn list_orders_for_account(&self, user_id: Uuid) -> StoreResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC");
        decode_orders(sqlx::query_as::<_, OrderRow>(&sql).bind(user_id).fetch_all(&self.pool).await?)
    }

    async fn order_lines(&self, order_id: Uuid) -> StoreResult<Vec<OrderLineDetail>> {
        Ok(sqlx::query_as::<_, OrderLineDetail>(
            "SELECT oi.id, oi.order_id, oi.product_id, oi.quantity, oi.price,
                    p.name AS product_name, p.image_url AS product_image_url
             FROM order_items oi LEFT JOIN products p ON p.id = oi.product_id
             WHERE oi.order_id = $1 ORDER BY oi.id",
        )
        .bind(order_id).fetch_all(&self.pool).await?)
    }

    async fn set_status(&self, id: Uuid, status: OrderStatus) -> StoreResult<Option<Order>> {
        let sql = format!("UPDATE orders SET status = $2 WHERE id = $1 RETURNING {ORDER_COLUMNS}");
        sqlx::query_as::<_, OrderRow>(&sql).bind(id).bind(status.as_str()).fetch_optional(&self.pool).await?
            .map(Order::try_from).transpose()
    }

    async fn apply_payment(&self, payment_id: &str, order_id: Uuid) -> StoreResult<PaymentApplication> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 FOR UPDATE");
        let Some(current) = sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).fetch_optional(&mut *tx).await? else {
            tx.rollback().await?;
            return Ok(PaymentApplication::OrderMissing);
        };
        let current = Order::try_from(current)?;

        let recorded = sqlx::query(
            "INSERT INTO processed_payments (payment_id, order_id) VALUES ($1, $2) ON CONFLICT (payment_id) DO NOTHING",
        )
        .bind(payment_id).bind(order_id).execute(&mut *tx).await?;
        if recorded.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(PaymentApplication::AlreadyProcessed);
        }

        let order = if payable(current.status) {
            let sql = format!("UPDATE orders SET status = 'paid' WHERE id = $1 RETURNING {ORDER_COLUMNS}");
            Order::try_from(sqlx::query_as::<_, OrderRow>(&sql).bind(order_id).fetch_one(&mut *tx).await?)?
        } else {
            current
        };

        let sold: Vec<(i64,)> = sqlx::query_as(
            "UPDATE products SET is_sold = TRUE
             WHERE id IN (SELECT product_id FROM order_items WHERE order_id = $1)
             RETURNING id",
        )
        .bind(order_id).fetch_all(&mut *tx).await?;

        tx.commit().await?;
        let mut sold_product_ids: Vec<i64> = sold.into_iter().map(|(id,)| id).collect();
        sold_product_ids.sort_unstable();
        Ok(PaymentApplication::Applied { order, sold_product_ids })
    }
}

#[async_trait]
impl ProfileStore for PgStore {
    async fn get_profile(&self, user_id: Uuid) -> StoreResult<Option<Profile>> {
        Ok(sqlx::query_as::<_, Profile>("SELECT id, full_name, updated_at FROM user_profiles WHERE id = $1")
            .bind(user_id).fetch_optional(&self.pool).await?)
    }

    async fn upsert_display_name(&self, user_id: Uuid, full_name: &str) -> StoreResult<Profile> {
        Ok(sqlx::query_as::<_, Profile>(
            "INSERT INTO user_profiles (id, full_name, updated_at) VALUES ($1, $2, NOW())
             ON CONFLICT (id) DO UPDATE SET full_name = EXCLUDED.full_name, updated_at = NOW()
             RETURNING id, full_name, updated_at",
        )
        .bind(user_id).bind(full_name).fetch_one(&self.pool).await?)
    }
}
