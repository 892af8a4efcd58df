//! Sessions issued by the managed auth backend.
//!
//! Access tokens are HS256 JWTs signed with the project secret. They arrive
//! either as a bearer header (API clients) or as the `sb-access-token`
//! cookie (browser). Account routes extract a [`Session`]; the back office
//! sits behind [`admin_gate`].

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::SupabaseConfig;
use crate::error::AppError;
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sb-access-token";
pub const LOGIN_PATH: &str = "/login";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub email: Option<String>,
    pub exp: usize,
}

/// Authenticated caller.
#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
}

#[derive(Clone)]
pub struct SessionVerifier { key: Option<DecodingKey> }

impl SessionVerifier {
    pub fn new(secret: Option<&str>) -> Self {
        Self { key: secret.filter(|s| !s.is_empty()).map(|s| DecodingKey::from_secret(s.as_bytes())) }
    }

    pub fn verify(&self, token: &str) -> Result<Session, AppError> {
        let key = self.key.as_ref().ok_or_else(|| AppError::Unauthorized("sessions are not configured".to_string()))?;
        let mut validation = Validation::new(Algorithm::HS256);
        // access tokens carry aud=authenticated; signature and expiry are what matter here
        validation.validate_aud = false;

        let claims = decode::<Claims>(token, key, &validation)
            .map(|data| data.claims)
            .map_err(|e| AppError::Unauthorized(format!("Invalid token: {e}")))?;
        let user_id = claims.sub.parse::<Uuid>().map_err(|_| AppError::Unauthorized("Invalid token subject".to_string()))?;
        Ok(Session { user_id, email: claims.email.unwrap_or_default(), })
    }

    /// Reads and verifies the session carried by a request, if any.
    pub fn from_headers(&self, headers: &HeaderMap) -> Result<Session, AppError> {
        let token = token_from_headers(headers).ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;
        self.verify(&token)
    }
}

pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .flat_map(|h| h.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == SESSION_COOKIE)
            .map(|(_, value)| value.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>() {
            return Ok(session.clone());
        }
        state.sessions.from_headers(&parts.headers)
    }
}

/// Guards every back-office route: no valid session redirects to the login
/// page before any handler runs; a session outside the allowlist is refused.
pub async fn admin_gate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let session = match state.sessions.from_headers(req.headers()) {
        Ok(session) => session,
        Err(e) => {
            tracing::info!(path = %req.uri().path(), reason = %e, "admin access without session");
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };
    if !state.config.admin.allows(&session.email) {
        tracing::warn!(user_id = %session.user_id, "admin access refused");
        return AppError::Forbidden("Admin access required".to_string()).into_response();
    }
    req.extensions_mut().insert(session);
    next.run(req).await
}

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("auth api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid auth response: {0}")]
    InvalidResponse(String),
    #[error("authentication backend is not configured")]
    NotConfigured,
}

impl From<IdentityError> for AppError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::InvalidCredentials => AppError::Unauthorized(err.to_string()),
            IdentityError::NotConfigured => AppError::Config(err.to_string()),
            other => AppError::Internal(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthTokens {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, IdentityError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

/// GoTrue password grant and logout.
#[derive(Clone)]
pub struct SupabaseAuth {
    http: reqwest::Client,
    base_url: Option<String>,
    anon_key: Option<String>,
}

impl SupabaseAuth {
    pub fn new(config: &SupabaseConfig) -> Self {
        Self { http: reqwest::Client::new(), base_url: config.url.clone(), anon_key: config.anon_key.clone() }
    }

    fn endpoint(&self) -> Result<(&str, &str), IdentityError> {
        match (self.base_url.as_deref(), self.anon_key.as_deref()) {
            (Some(url), Some(key)) => Ok((url, key)),
            _ => Err(IdentityError::NotConfigured),
        }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    #[tracing::instrument(skip(self, password))]
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, IdentityError> {
        let (url, key) = self.endpoint()?;
        let resp = self
            .http
            .post(format!("{url}/auth/v1/token"))
            .query(&[("grant_type", "password")])
            .header("apikey", key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if status.as_u16() == 400 || status.as_u16() == 401 {
            return Err(IdentityError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(IdentityError::Api { status: status.as_u16(), body });
        }
        serde_json::from_str::<AuthTokens>(&body).map_err(|e| IdentityError::InvalidResponse(e.to_string()))
    }

    #[tracing::instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let (url, key) = self.endpoint()?;
        let resp = self.http.post(format!("{url}/auth/v1/logout")).header("apikey", key).bearer_auth(access_token).send().await?;
        let status = resp.status();
        // an already-expired token is as good as signed out
        if status.is_success() || status.as_u16() == 401 {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(IdentityError::Api { status: status.as_u16(), body })
    }
}
