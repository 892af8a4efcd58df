use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use uuid::Uuid;
use validator::Validate;

use crate::auth::Session;
use crate::domain::aggregates::{Order, OrderWithLines, ProfileUpdate};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileView {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    /// False until the customer has set a display name.
    pub complete: bool,
}

pub async fn get_profile(State(s): State<AppState>, session: Session) -> Result<Json<ProfileView>> {
    let full_name = s.profiles.get_profile(session.user_id).await?.and_then(|p| p.full_name);
    Ok(Json(ProfileView { id: session.user_id, email: session.email, complete: full_name.is_some(), full_name }))
}

pub async fn update_profile(
    State(s): State<AppState>,
    session: Session,
    Json(mut req): Json<ProfileUpdate>,
) -> Result<Json<ProfileView>> {
    req.full_name = req.full_name.trim().to_string();
    req.validate()?;
    let profile = s.profiles.upsert_display_name(session.user_id, &req.full_name).await?;
    Ok(Json(ProfileView { id: profile.id, email: session.email, complete: true, full_name: profile.full_name }))
}

pub async fn list_orders(State(s): State<AppState>, session: Session) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.orders.list_orders_for_account(session.user_id).await?))
}

/// Orders of other accounts read as not found.
pub async fn get_order(State(s): State<AppState>, session: Session, Path(id): Path<Uuid>) -> Result<Json<OrderWithLines>> {
    let order = s
        .orders
        .get_order(id)
        .await?
        .filter(|o| o.user_id == Some(session.user_id))
        .ok_or_else(|| AppError::NotFound(format!("order {id} not found")))?;
    let items = s.orders.order_lines(order.id).await?;
    Ok(Json(OrderWithLines { order, items }))
}
