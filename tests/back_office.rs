use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
};
use serde_json::json;
use uuid::Uuid;

use jewelry_storefront::{domain::aggregates::OrderStatus, store::OrderStore};

mod support;

fn admin_token() -> String { support::token_for(Uuid::new_v4(), support::ADMIN_EMAIL) }

#[tokio::test]
async fn admin_routes_redirect_to_login_without_session() {
    let app = support::spawn_app();
    for uri in ["/admin", "/api/v1/admin/dashboard", "/api/v1/admin/products", "/api/v1/admin/orders"] {
        let resp = tower::ServiceExt::oneshot(app.router.clone(), Request::get(uri).body(Body::empty()).unwrap()).await.unwrap();
        assert_eq!(resp.status(), StatusCode::SEE_OTHER, "{uri}");
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/login");
    }

    let (status, _) = app.request(Method::GET, "/admin", None, Some("not-a-jwt")).await;
    assert_eq!(status, StatusCode::SEE_OTHER);
    let (status, body) = app.get("/login").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["endpoint"], "/api/v1/auth/login");
}

#[tokio::test]
async fn admin_requires_allowlisted_email() {
    let app = support::spawn_app();
    let stranger = support::token_for(Uuid::new_v4(), "someone@else.example");
    let (status, _) = app.request(Method::GET, "/api/v1/admin/dashboard", None, Some(&stranger)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.request(Method::GET, "/api/v1/admin/dashboard", None, Some(&admin_token())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["products"]["total"], 0);
}

#[tokio::test]
async fn session_cookie_opens_the_back_office() {
    let app = support::spawn_app();
    let req = Request::get("/admin")
        .header(header::COOKIE, format!("sb-access-token={}", admin_token()))
        .body(Body::empty())
        .unwrap();
    let (status, body) = app.send(req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["orders"].is_object());
}

#[tokio::test]
async fn product_crud_validates_input() {
    let app = support::spawn_app();
    let token = admin_token();

    let (status, body) = app
        .request(Method::POST, "/api/v1/admin/products", Some(json!({ "name": "An", "price": "0" })), Some(&token))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["name"].is_array());
    assert!(body["fields"]["price"].is_array());

    let (status, created) = app
        .request(
            Method::POST,
            "/api/v1/admin/products",
            Some(json!({ "name": "Anillo Sello", "price": "25000", "collection": "Verano", "description": " " })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["is_sold"], false);
    assert_eq!(created["description"], serde_json::Value::Null);
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = app
        .request(
            Method::PUT,
            &format!("/api/v1/admin/products/{id}"),
            Some(json!({ "name": "Anillo Sello Oro", "price": "32000" })),
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Anillo Sello Oro");

    let (_, public) = app.get(&format!("/api/v1/products/{id}")).await;
    assert_eq!(public["price"], "32000");

    let (status, _) = app.request(Method::DELETE, &format!("/api/v1/admin/products/{id}"), None, Some(&token)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.request(Method::DELETE, &format!("/api/v1/admin/products/{id}"), None, Some(&token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn multipart_upload(field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
    let boundary = "X-STOREFRONT-BOUNDARY";
    let mut body = format!(
        "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .into_bytes();
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::post("/api/v1/admin/uploads")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin_token()))
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={boundary}"))
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn image_upload_checks_type_before_storing() {
    let app = support::spawn_app();

    let (status, body) = app.send(multipart_upload("image", "anillo sello.png", "image/png", &[0u8; 2048])).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert!(body["path"].as_str().unwrap().ends_with("-anillo-sello.png"));
    assert!(body["url"].as_str().unwrap().starts_with("https://cdn.example/product_images/"));

    let (status, body) = app.send(multipart_upload("image", "anim.gif", "image/gif", &[0u8; 16])).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["fields"]["image"].is_array());
    assert_eq!(app.storage.uploads.lock().await.len(), 1);
}

#[tokio::test]
async fn order_status_updates_follow_fulfilment_rules() {
    let app = support::spawn_app();
    let token = admin_token();
    app.seed_product(1, "Anillo Sello", 25000, None).await;
    app.post("/api/v1/cart/s1/items", json!({ "product_id": 1 })).await;
    let (_, body) =
        app.post("/api/v1/checkout", json!({ "session_id": "s1", "name": "Paula", "email": "paula@example.com" })).await;
    let order_id: Uuid = body["order"]["id"].as_str().unwrap().parse().unwrap();
    let uri = format!("/api/v1/admin/orders/{order_id}/status");

    let (status, _) = app.request(Method::PUT, &uri, Some(json!({ "status": "paid" })), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.request(Method::PUT, &uri, Some(json!({ "status": "shipped" })), Some(&token)).await;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = app.request(Method::PUT, &uri, Some(json!({ "status": "lost" })), Some(&token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    app.payments.set_payment("1", "approved", order_id).await;
    app.post("/api/v1/webhooks/payment", json!({ "type": "payment", "data": { "id": "1" } })).await;
    let (status, order) = app.request(Method::PUT, &uri, Some(json!({ "status": "shipped" })), Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(order["status"], "shipped");
    assert_eq!(app.store.get_order(order_id).await.unwrap().unwrap().status, OrderStatus::Shipped);

    let (_, detail) = app.request(Method::GET, &format!("/api/v1/admin/orders/{order_id}"), None, Some(&token)).await;
    assert_eq!(detail["items"][0]["product_name"], "Anillo Sello");
    let (_, shipped) = app.request(Method::GET, "/api/v1/admin/orders?status=shipped", None, Some(&token)).await;
    assert_eq!(shipped.as_array().map(Vec::len), Some(1));
}
