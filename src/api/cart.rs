use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::domain::aggregates::Cart;
use crate::domain::value_objects::Quantity;
use crate::error::{AppError, Result};
use crate::state::AppState;

const MAX_SESSION_ID_LEN: usize = 128;

#[derive(Debug, Deserialize)]
pub struct AddItem { pub product_id: i64 }

#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    /// Loosely typed on purpose: anything non-numeric becomes 1.
    #[serde(default)]
    pub quantity: serde_json::Value,
}

fn session_id(raw: &str) -> Result<&str> {
    let id = raw.trim();
    if id.is_empty() || id.len() > MAX_SESSION_ID_LEN {
        return Err(AppError::BadRequest("invalid cart session id".to_string()));
    }
    Ok(id)
}

pub async fn get_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<Cart>> {
    Ok(Json(s.carts.snapshot(session_id(&session)?).await))
}

pub async fn add_item(State(s): State<AppState>, Path(session): Path<String>, Json(req): Json<AddItem>) -> Result<Json<Cart>> {
    let session = session_id(&session)?;
    let product = s
        .catalog
        .get_product(req.product_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {} not found", req.product_id)))?;
    if !product.is_available() {
        return Err(AppError::Conflict(format!("product {} is already sold", product.id)));
    }
    let ((), cart) = s.carts.with_cart(session, |c| c.add(&product)).await;
    Ok(Json(cart))
}

pub async fn update_item(
    State(s): State<AppState>,
    Path((session, product_id)): Path<(String, i64)>,
    Json(req): Json<UpdateQuantity>,
) -> Result<Json<Cart>> {
    let quantity = Quantity::parse(&req.quantity);
    let cart = s.carts.with_existing_cart(session_id(&session)?, |c| c.update_quantity(product_id, quantity)).await;
    Ok(Json(cart))
}

pub async fn remove_item(State(s): State<AppState>, Path((session, product_id)): Path<(String, i64)>) -> Result<Json<Cart>> {
    let cart = s.carts.with_existing_cart(session_id(&session)?, |c| c.remove(product_id)).await;
    Ok(Json(cart))
}

pub async fn clear_cart(State(s): State<AppState>, Path(session): Path<String>) -> Result<Json<Cart>> {
    Ok(Json(s.carts.clear(session_id(&session)?).await))
}
