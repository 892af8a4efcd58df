use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use validator::ValidationErrors;

use crate::domain::aggregates::OrderError;
use crate::payment::PaymentError;
use crate::storage::StorageError;
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("payment provider error: {0}")]
    Payment(PaymentError),

    #[error("file storage error: {0}")]
    Storage(StorageError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self { AppError::Store(StoreError::from(err)) }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::NotConfigured => AppError::Config(err.to_string()),
            other => AppError::Payment(other),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotConfigured => AppError::Config(err.to_string()),
            other => AppError::Storage(other),
        }
    }
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        match err {
            OrderError::EmptyCart | OrderError::UnknownStatus(_) => AppError::BadRequest(err.to_string()),
            OrderError::InvalidTransition { .. } => AppError::Conflict(err.to_string()),
        }
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) | AppError::Store(StoreError::Constraint(_)) => StatusCode::CONFLICT,
            AppError::Payment(_) | AppError::Storage(_) => StatusCode::BAD_GATEWAY,
            AppError::Config(_) | AppError::Store(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            AppError::Validation(errors) => {
                let fields: serde_json::Map<String, serde_json::Value> = errors
                    .field_errors()
                    .into_iter()
                    .map(|(field, errs)| {
                        let messages: Vec<String> = errs
                            .iter()
                            .map(|e| e.message.as_ref().map(|m| m.to_string()).unwrap_or_else(|| e.code.to_string()))
                            .collect();
                        (field.to_string(), json!(messages))
                    })
                    .collect();
                json!({ "error": "validation failed", "fields": fields })
            }
            AppError::Store(StoreError::Constraint(msg)) => json!({ "error": msg }),
            AppError::Store(e) => {
                tracing::error!(error = %e, "store error");
                json!({ "error": "store operation failed" })
            }
            AppError::Config(msg) => {
                tracing::error!(%msg, "configuration error");
                json!({ "error": msg })
            }
            AppError::Internal(msg) => {
                tracing::error!(%msg, "internal error");
                json!({ "error": msg })
            }
            AppError::Payment(e) => {
                tracing::error!(error = %e, "payment provider error");
                json!({ "error": e.to_string() })
            }
            AppError::Storage(e) => {
                tracing::error!(error = %e, "file storage error");
                json!({ "error": e.to_string() })
            }
            AppError::BadRequest(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => json!({ "error": msg }),
        };
        (status, Json(body)).into_response()
    }
}

pub type Result<T, E = AppError> = std::result::Result<T, E>;
