//! HTTP surface.

mod account;
mod admin;
mod auth;
mod cart;
mod catalog;
mod checkout;
mod webhooks;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderMap, HeaderName, HeaderValue, Method},
    middleware,
    routing::{get, post, put},
    Json, Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::auth::admin_gate;
use crate::error::{AppError, Result};
use crate::state::AppState;

pub fn router(state: AppState) -> Result<Router> {
    let public = Router::new()
        .route("/api/v1/products", get(catalog::list_products))
        .route("/api/v1/products/:id", get(catalog::get_product))
        .route("/api/v1/collections/:name", get(catalog::collection))
        .route("/api/v1/search", get(catalog::search))
        .route("/api/v1/cart/:session", get(cart::get_cart).delete(cart::clear_cart))
        .route("/api/v1/cart/:session/items", post(cart::add_item))
        .route("/api/v1/cart/:session/items/:product_id", put(cart::update_item).delete(cart::remove_item))
        .route("/api/v1/checkout", post(checkout::checkout))
        .route("/api/v1/payment/success", get(checkout::payment_success))
        .route("/api/v1/payment/failure", get(checkout::payment_failure))
        .route("/api/v1/payment/pending", get(checkout::payment_pending))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        .route("/login", get(auth::login_page))
        .route("/api/v1/account/profile", get(account::get_profile).put(account::update_profile))
        .route("/api/v1/account/orders", get(account::list_orders))
        .route("/api/v1/account/orders/:id", get(account::get_order));

    let admin = Router::new()
        .route("/admin", get(admin::dashboard))
        .route("/api/v1/admin/dashboard", get(admin::dashboard))
        .route("/api/v1/admin/products", get(admin::list_products).post(admin::create_product))
        .route("/api/v1/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/api/v1/admin/uploads", post(admin::upload_image))
        .route("/api/v1/admin/orders", get(admin::list_orders))
        .route("/api/v1/admin/orders/:id", get(admin::get_order))
        .route("/api/v1/admin/orders/:id/status", put(admin::update_order_status))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_gate));

    let site = Router::new()
        .route("/health", get(health))
        .merge(public)
        .merge(admin)
        .layer(site_cors(&state.config.cors.allowed_origins)?);

    // called server-to-server by the payment provider, from any origin
    let webhooks = Router::new()
        .route("/api/v1/webhooks/payment", post(webhooks::payment_notification).options(webhooks::preflight))
        .layer(webhook_cors());

    Ok(Router::new()
        .merge(site)
        .merge(webhooks)
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy", "service": "jewelry-storefront" }))
}

fn site_cors(allowed_origins: &[String]) -> Result<CorsLayer> {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);
    if allowed_origins.is_empty() {
        return Ok(cors.allow_origin(Any));
    }
    let origins = allowed_origins
        .iter()
        .map(|origin| origin.parse::<HeaderValue>().map_err(|_| AppError::Config(format!("Invalid CORS origin: {origin}"))))
        .collect::<Result<Vec<_>>>()?;
    Ok(cors.allow_origin(origins).allow_credentials(true))
}

fn webhook_cors() -> CorsLayer {
    CorsLayer::new().allow_origin(Any).allow_methods([Method::POST, Method::OPTIONS]).allow_headers([
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        HeaderName::from_static("x-client-info"),
        HeaderName::from_static("apikey"),
    ])
}

/// Base URL payment return links point at: the caller's Origin, else the configured site.
pub(crate) fn site_url(headers: &HeaderMap, fallback: &str) -> String {
    headers
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|o| o.starts_with("http://") || o.starts_with("https://"))
        .unwrap_or(fallback)
        .trim_end_matches('/')
        .to_string()
}
