use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use validator::Validate;

use crate::auth::{token_from_headers, AuthTokens, SESSION_COOKIE};
use crate::error::{AppError, Result};
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    pub password: String,
}

fn session_cookie(token: &str, max_age: u64) -> Result<HeaderValue> {
    HeaderValue::from_str(&format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}"))
        .map_err(|_| AppError::Internal("access token is not a valid cookie value".to_string()))
}

pub async fn login(State(s): State<AppState>, Json(req): Json<LoginRequest>) -> Result<Response> {
    req.validate()?;
    let tokens: AuthTokens = s.identity.sign_in(req.email.trim(), &req.password).await?;
    let cookie = session_cookie(&tokens.access_token, tokens.expires_in.unwrap_or(3600))?;
    tracing::info!("signed in");
    Ok(([(header::SET_COOKIE, cookie)], Json(tokens)).into_response())
}

pub async fn logout(State(s): State<AppState>, headers: HeaderMap) -> Result<Response> {
    if let Some(token) = token_from_headers(&headers) {
        s.identity.sign_out(&token).await?;
    }
    Ok((StatusCode::NO_CONTENT, [(header::SET_COOKIE, session_cookie("", 0)?)]).into_response())
}

pub async fn login_page() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "page": "login",
        "message": "Sign in to continue",
        "endpoint": "/api/v1/auth/login",
        "method": "POST",
        "fields": ["email", "password"],
    }))
}
