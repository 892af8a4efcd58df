//! Back office. Every handler here runs behind the admin gate.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::Session;
use crate::domain::aggregates::{ImageUpload, Order, OrderError, OrderStatus, OrderWithLines, Product, ProductInput};
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct Dashboard {
    pub products: ProductCounts,
    pub orders: OrderCounts,
    /// Sum of totals of orders that were paid for.
    pub revenue: Decimal,
}

#[derive(Debug, Default, Serialize)]
pub struct ProductCounts { pub total: usize, pub available: usize, pub sold: usize }

#[derive(Debug, Default, Serialize)]
pub struct OrderCounts {
    pub total: usize,
    pub pending: usize,
    pub paid: usize,
    pub shipped: usize,
    pub completed: usize,
    pub cancelled: usize,
}

#[derive(Debug, Deserialize)]
pub struct OrderFilter { pub status: Option<String> }

#[derive(Debug, Deserialize)]
pub struct StatusUpdate { pub status: String }

#[derive(Debug, Serialize)]
pub struct UploadedImage { pub url: String, pub path: String }

pub async fn dashboard(State(s): State<AppState>, Extension(session): Extension<Session>) -> Result<Json<Dashboard>> {
    let products = s.catalog.list_products().await?;
    let orders = s.orders.list_orders().await?;
    tracing::debug!(user_id = %session.user_id, "admin dashboard");

    let sold = products.iter().filter(|p| p.is_sold).count();
    let mut counts = OrderCounts { total: orders.len(), ..Default::default() };
    let mut revenue = Decimal::ZERO;
    for o in &orders {
        match o.status {
            OrderStatus::Pending => counts.pending += 1,
            OrderStatus::Paid => counts.paid += 1,
            OrderStatus::Shipped => counts.shipped += 1,
            OrderStatus::Completed => counts.completed += 1,
            OrderStatus::Cancelled => counts.cancelled += 1,
        }
        if matches!(o.status, OrderStatus::Paid | OrderStatus::Shipped | OrderStatus::Completed) {
            revenue += o.total_price;
        }
    }

    Ok(Json(Dashboard {
        products: ProductCounts { total: products.len(), available: products.len() - sold, sold },
        orders: counts,
        revenue,
    }))
}

pub async fn list_products(State(s): State<AppState>) -> Result<Json<Vec<Product>>> {
    Ok(Json(s.catalog.list_products().await?))
}

pub async fn create_product(State(s): State<AppState>, Json(input): Json<ProductInput>) -> Result<(StatusCode, Json<Product>)> {
    let input = input.normalized();
    input.validate()?;
    let product = s.catalog.create_product(&input).await?;
    tracing::info!(product_id = product.id, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(State(s): State<AppState>, Path(id): Path<i64>, Json(input): Json<ProductInput>) -> Result<Json<Product>> {
    let input = input.normalized();
    input.validate()?;
    let product = s.catalog.update_product(id, &input).await?.ok_or_else(|| AppError::NotFound(format!("product {id} not found")))?;
    tracing::info!(product_id = id, "product updated");
    Ok(Json(product))
}

pub async fn delete_product(State(s): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode> {
    if !s.catalog.delete_product(id).await? {
        return Err(AppError::NotFound(format!("product {id} not found")));
    }
    tracing::info!(product_id = id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// Accepts the first file part (field `image` or `file`) of a multipart body.
pub async fn upload_image(State(s): State<AppState>, mut multipart: Multipart) -> Result<(StatusCode, Json<UploadedImage>)> {
    while let Some(field) = multipart.next_field().await.map_err(|e| AppError::BadRequest(e.to_string()))? {
        if !matches!(field.name(), Some("image") | Some("file")) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_ascii_lowercase();
        let bytes = field.bytes().await.map_err(|e| AppError::BadRequest(e.to_string()))?;

        let upload = ImageUpload { file_name, content_type, size: bytes.len() };
        upload.check()?;
        let path = upload.object_name(Utc::now());
        let url = s.storage.upload(&path, &upload.content_type, bytes.to_vec()).await?;
        return Ok((StatusCode::CREATED, Json(UploadedImage { url, path })));
    }
    Err(AppError::BadRequest("multipart field 'image' is required".to_string()))
}

pub async fn list_orders(State(s): State<AppState>, Query(f): Query<OrderFilter>) -> Result<Json<Vec<Order>>> {
    let status = f.status.as_deref().filter(|v| !v.trim().is_empty()).map(str::parse::<OrderStatus>).transpose()?;
    let orders = s.orders.list_orders().await?;
    Ok(Json(orders.into_iter().filter(|o| status.map_or(true, |st| o.status == st)).collect()))
}

pub async fn get_order(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<OrderWithLines>> {
    let order = s.orders.get_order(id).await?.ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let items = s.orders.order_lines(id).await?;
    Ok(Json(OrderWithLines { order, items }))
}

/// Fulfilment transitions. `paid` is reserved for payment confirmation.
pub async fn update_order_status(
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<StatusUpdate>,
) -> Result<Json<Order>> {
    let next: OrderStatus = req.status.parse()?;
    if next == OrderStatus::Paid {
        return Err(AppError::BadRequest("orders are marked paid only by payment confirmation".to_string()));
    }
    let current = s.orders.get_order(id).await?.ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    if !current.status.can_transition_to(next) {
        return Err(OrderError::InvalidTransition { from: current.status, to: next }.into());
    }
    let order = s.orders.set_status(id, next).await?.ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    tracing::info!(order_id = %id, from = %current.status, to = %next, "order status changed");
    s.events.publish(DomainEvent::Order(OrderEvent::StatusChanged { order_id: id, status: next })).await;
    Ok(Json(order))
}
