use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::{json, Value};
use uuid::Uuid;

use jewelry_storefront::{domain::aggregates::OrderStatus, store::OrderStore};

mod support;

const WEBHOOK: &str = "/api/v1/webhooks/payment";

async fn place_order(app: &support::TestApp) -> Uuid {
    app.seed_product(1, "Anillo Sello", 25000, None).await;
    app.seed_product(2, "Aros Perla", 18500, None).await;
    app.seed_product(3, "Cadena Fina", 12000, None).await;
    app.post("/api/v1/cart/s1/items", json!({ "product_id": 1 })).await;
    app.post("/api/v1/cart/s1/items", json!({ "product_id": 2 })).await;
    let (status, body) =
        app.post("/api/v1/checkout", json!({ "session_id": "s1", "name": "Paula", "email": "paula@example.com" })).await;
    assert_eq!(status, StatusCode::CREATED);
    body["order"]["id"].as_str().unwrap().parse().unwrap()
}

fn notification(payment_id: &str) -> Value { json!({ "type": "payment", "data": { "id": payment_id } }) }

#[tokio::test]
async fn approved_payment_marks_order_paid_and_products_sold() {
    let app = support::spawn_app();
    let order_id = place_order(&app).await;
    app.payments.set_payment("555", "approved", order_id).await;

    let (status, body) = app.post(WEBHOOK, notification("555")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");

    let order = app.store.get_order(order_id).await.unwrap().unwrap();
    assert_eq!(order.status, OrderStatus::Paid);
    assert!(app.product(1).await.is_sold);
    assert!(app.product(2).await.is_sold);
    assert!(!app.product(3).await.is_sold);

    let (status, _) = app.post("/api/v1/cart/s2/items", json!({ "product_id": 1 })).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn non_approved_statuses_change_nothing() {
    for status in ["pending", "rejected", "in_process"] {
        let app = support::spawn_app();
        let order_id = place_order(&app).await;
        app.payments.set_payment("777", status, order_id).await;

        let (code, _) = app.post(WEBHOOK, notification("777")).await;
        assert_eq!(code, StatusCode::OK, "status {status}");
        assert_eq!(app.store.get_order(order_id).await.unwrap().unwrap().status, OrderStatus::Pending);
        assert!(!app.product(1).await.is_sold);
        assert_eq!(app.store.processed_payment_count().await, 0);
    }
}

#[tokio::test]
async fn redelivery_is_idempotent() {
    let app = support::spawn_app();
    let order_id = place_order(&app).await;
    app.payments.set_payment("555", "approved", order_id).await;

    let (first, _) = app.post(WEBHOOK, notification("555")).await;
    let after_first = app.store.get_order(order_id).await.unwrap().unwrap();
    let (second, _) = app.post(WEBHOOK, json!({ "type": "payment", "data": { "id": 555 } })).await;
    let after_second = app.store.get_order(order_id).await.unwrap().unwrap();

    assert_eq!(first, StatusCode::OK);
    assert_eq!(second, StatusCode::OK);
    assert_eq!(after_first, after_second);
    assert_eq!(app.store.processed_payment_count().await, 1);
    assert!(app.product(1).await.is_sold);
}

#[tokio::test]
async fn other_event_types_are_acknowledged() {
    let app = support::spawn_app();
    let (status, _) = app.post(WEBHOOK, json!({ "type": "merchant_order", "data": { "id": "1" } })).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn payment_event_without_id_is_a_server_error() {
    let app = support::spawn_app();
    for body in [json!({ "type": "payment" }), json!({ "type": "payment", "data": {} })] {
        let (status, body) = app.post(WEBHOOK, body).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].is_string());
    }
}

#[tokio::test]
async fn missing_access_token_is_fatal() {
    let mut config = support::test_config(&[]);
    config.payment.access_token = None;
    let app = support::spawn_app_with(config);

    let (status, body) = app.post(WEBHOOK, notification("555")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn unknown_order_or_provider_failure_is_a_server_error() {
    let app = support::spawn_app();
    app.payments.set_payment("900", "approved", Uuid::new_v4()).await;
    let (status, _) = app.post(WEBHOOK, notification("900")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app.post(WEBHOOK, notification("does-not-exist")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn preflight_is_allowed_from_any_origin() {
    let app = support::spawn_app_with(support::test_config(&[("CORS_ALLOWED_ORIGINS", "https://joyas.example")]));
    let req = Request::builder()
        .method(Method::OPTIONS)
        .uri(WEBHOOK)
        .header(header::ORIGIN, "https://api.mercadopago.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type,x-client-info")
        .body(Body::empty())
        .unwrap();
    let resp = tower::ServiceExt::oneshot(app.router.clone(), req).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
}
