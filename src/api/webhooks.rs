use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::services::PaymentNotification;
use crate::state::AppState;

/// Acknowledges every recognized event with 200; internal failures answer
/// 500 so the provider redelivers.
pub async fn payment_notification(State(s): State<AppState>, body: Bytes) -> Response {
    let notification: PaymentNotification = match serde_json::from_slice(&body) {
        Ok(n) => n,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable payment notification");
            return (StatusCode::BAD_REQUEST, Json(json!({ "error": format!("invalid notification body: {e}") }))).into_response();
        }
    };

    match s.confirmation.handle(&notification).await {
        Ok(outcome) => {
            tracing::debug!(?outcome, "payment notification handled");
            (StatusCode::OK, "OK").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "payment notification failed");
            (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({ "error": e.to_string() }))).into_response()
        }
    }
}

pub async fn preflight() -> &'static str { "ok" }
