#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use rust_decimal::Decimal;
use serde_json::Value;
use tokio::sync::Mutex;
use tower::ServiceExt;
use uuid::Uuid;

use jewelry_storefront::{
    api,
    auth::{AuthTokens, Claims, IdentityError, IdentityProvider},
    config::AppConfig,
    domain::{aggregates::Product, events::EventPublisher},
    payment::{PaymentError, PaymentGateway, PaymentInfo, PaymentStatus, Preference, PreferenceRequest},
    storage::{FileStorage, StorageError},
    store::{CatalogStore, MemoryStore},
    AppState, Backends,
};

pub const JWT_SECRET: &str = "test-secret-with-enough-bytes-for-hs256";
pub const ADMIN_EMAIL: &str = "owner@joyas.example";

#[derive(Default)]
pub struct FakePayments {
    pub preferences: Mutex<Vec<PreferenceRequest>>,
    pub payments: Mutex<HashMap<String, PaymentInfo>>,
    pub fail_preferences: Mutex<bool>,
}

impl FakePayments {
    pub async fn set_payment(&self, id: &str, status: &str, order_id: Uuid) {
        self.payments.lock().await.insert(
            id.to_string(),
            PaymentInfo { id: id.to_string(), status: PaymentStatus::parse(status), external_reference: Some(order_id.to_string()) },
        );
    }
}

#[async_trait]
impl PaymentGateway for FakePayments {
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference, PaymentError> {
        if *self.fail_preferences.lock().await {
            return Err(PaymentError::Api { status: 500, body: "provider down".into() });
        }
        let mut prefs = self.preferences.lock().await;
        prefs.push(request);
        let id = format!("pref-{}", prefs.len());
        Ok(Preference { init_point: format!("https://pay.example/checkout?pref_id={id}"), id })
    }

    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PaymentError> {
        self.payments
            .lock()
            .await
            .get(payment_id)
            .cloned()
            .ok_or_else(|| PaymentError::Api { status: 404, body: "payment not found".into() })
    }
}

#[derive(Default)]
pub struct FakeStorage { pub uploads: Mutex<Vec<(String, String, usize)>> }

#[async_trait]
impl FileStorage for FakeStorage {
    async fn upload(&self, object_name: &str, content_type: &str, bytes: Vec<u8>) -> Result<String, StorageError> {
        self.uploads.lock().await.push((object_name.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://cdn.example/product_images/{object_name}"))
    }
}

#[derive(Default)]
pub struct FakeIdentity;

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthTokens, IdentityError> {
        if password != "correct-horse" {
            return Err(IdentityError::InvalidCredentials);
        }
        Ok(AuthTokens { access_token: token_for(Uuid::new_v4(), email), refresh_token: None, expires_in: Some(3600) })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> { Ok(()) }
}

pub struct TestApp {
    pub router: Router,
    pub store: MemoryStore,
    pub payments: Arc<FakePayments>,
    pub storage: Arc<FakeStorage>,
}

pub fn test_config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = [
        ("MERCADOPAGO_ACCESS_TOKEN", "TEST-access-token"),
        ("MERCADOPAGO_PUBLIC_KEY", "TEST-public-key"),
        ("SUPABASE_JWT_SECRET", JWT_SECRET),
        ("ADMIN_EMAILS", ADMIN_EMAIL),
        ("SITE_URL", "http://shop.test"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in extra {
        vars.insert(k.to_string(), v.to_string());
    }
    AppConfig::from_lookup(|k| vars.get(k).cloned()).expect("test config")
}

pub fn spawn_app() -> TestApp { spawn_app_with(test_config(&[])) }

pub fn spawn_app_with(config: AppConfig) -> TestApp {
    let store = MemoryStore::new();
    let payments = Arc::new(FakePayments::default());
    let storage = Arc::new(FakeStorage::default());
    let backends = Backends {
        catalog: Arc::new(store.clone()),
        orders: Arc::new(store.clone()),
        profiles: Arc::new(store.clone()),
        payments: payments.clone(),
        storage: storage.clone(),
        identity: Arc::new(FakeIdentity),
    };
    let state = AppState::new(config, backends, EventPublisher::disabled());
    let router = api::router(state).expect("router");
    TestApp { router, store, payments, storage }
}

pub fn token_for(user_id: Uuid, email: &str) -> String {
    let claims = Claims { sub: user_id.to_string(), email: Some(email.to_string()), exp: (Utc::now().timestamp() + 3600) as usize };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(JWT_SECRET.as_bytes())).expect("token")
}

impl TestApp {
    pub async fn seed_product(&self, id: i64, name: &str, price: i64, collection: Option<&str>) -> Product {
        let product = Product {
            id,
            name: name.to_string(),
            description: Some(format!("{name} en plata 925")),
            price: Decimal::new(price, 0),
            image_url: Some(format!("https://cdn.example/{id}.jpg")),
            is_sold: false,
            collection: collection.map(Into::into),
            created_at: Utc::now(),
        };
        self.store.insert_product(product.clone()).await;
        product
    }

    pub async fn product(&self, id: i64) -> Product {
        self.store.get_product(id).await.expect("store").expect("product exists")
    }

    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        let req = match body {
            Some(b) => builder.header(header::CONTENT_TYPE, "application/json").body(Body::from(b.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request");
        self.send(req).await
    }

    pub async fn send(&self, req: Request<Body>) -> (StatusCode, Value) {
        let resp = self.router.clone().oneshot(req).await.expect("response");
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
        let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
        (status, value)
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) { self.request(Method::GET, uri, None, None).await }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body), None).await
    }
}
