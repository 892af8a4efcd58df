use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use serde::{Deserialize, Serialize};

use super::site_url;
use crate::auth::Session;
use crate::domain::aggregates::ContactDetails;
use crate::error::Result;
use crate::services::CheckoutOutcome;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub session_id: String,
    pub name: String,
    pub email: String,
}

/// Query string the provider appends to the back URLs.
#[derive(Debug, Default, Deserialize)]
pub struct ReturnParams {
    pub session: Option<String>,
    pub payment_id: Option<String>,
    pub external_reference: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PaymentReturn {
    pub status: &'static str,
    pub message: &'static str,
    pub order_id: Option<String>,
    pub payment_id: Option<String>,
    pub cart_cleared: bool,
}

pub async fn checkout(
    State(s): State<AppState>,
    session: Option<Session>,
    headers: HeaderMap,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutOutcome>)> {
    let cart = s.carts.snapshot(req.session_id.trim()).await;
    let contact = ContactDetails { name: req.name, email: req.email };
    let base = site_url(&headers, &s.config.site.site_url);

    let outcome = s.checkout.checkout(&cart, &contact, session.map(|session| session.user_id), &base).await?;
    let status = match outcome {
        CheckoutOutcome::EmptyCart => StatusCode::OK,
        CheckoutOutcome::Ready { .. } => StatusCode::CREATED,
    };
    Ok((status, Json(outcome)))
}

pub async fn payment_success(State(s): State<AppState>, Query(p): Query<ReturnParams>) -> Json<PaymentReturn> {
    let session = p.session.as_deref().map(str::trim).filter(|id| !id.is_empty());
    if let Some(id) = session {
        s.carts.clear(id).await;
        tracing::info!(order_id = ?p.external_reference, "buyer returned from successful payment, cart cleared");
    }
    Json(PaymentReturn {
        status: "success",
        message: "Payment received. Thank you for your purchase!",
        order_id: p.external_reference,
        payment_id: p.payment_id,
        cart_cleared: session.is_some(),
    })
}

pub async fn payment_failure(Query(p): Query<ReturnParams>) -> Json<PaymentReturn> {
    Json(PaymentReturn {
        status: "failure",
        message: "The payment could not be completed. Your cart was kept so you can try again.",
        order_id: p.external_reference,
        payment_id: p.payment_id,
        cart_cleared: false,
    })
}

pub async fn payment_pending(Query(p): Query<ReturnParams>) -> Json<PaymentReturn> {
    Json(PaymentReturn {
        status: "pending",
        message: "The payment is being processed. We will confirm your order once it is approved.",
        order_id: p.external_reference,
        payment_id: p.payment_id,
        cart_cleared: false,
    })
}
