//! Mercado Pago REST client (bearer access token).

use async_trait::async_trait;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::{PaymentError, PaymentGateway, PaymentInfo, PaymentStatus, Preference, PreferenceRequest};
use crate::config::PaymentConfig;

#[derive(Clone)]
pub struct MercadoPagoClient {
    http: reqwest::Client,
    api_url: String,
    access_token: Option<String>,
    currency: String,
    notification_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct PreferenceBody<'a> {
    items: Vec<ItemBody<'a>>,
    payer: PayerBody<'a>,
    back_urls: BackUrls,
    auto_return: &'static str,
    external_reference: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    notification_url: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ItemBody<'a> {
    id: &'a str,
    title: &'a str,
    quantity: u32,
    unit_price: f64,
    currency_id: &'a str,
}

#[derive(Debug, Serialize)]
struct PayerBody<'a> {
    name: &'a str,
    email: &'a str,
}

#[derive(Debug, Serialize)]
struct BackUrls {
    success: String,
    failure: String,
    pending: String,
}

#[derive(Debug, Deserialize)]
struct PreferenceResponse {
    id: String,
    init_point: String,
}

#[derive(Debug, Deserialize)]
struct PaymentResponse {
    id: serde_json::Value,
    status: String,
    external_reference: Option<String>,
}

impl MercadoPagoClient {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            currency: config.currency.clone(),
            notification_url: config.notification_url(),
        }
    }

    fn token(&self) -> Result<&str, PaymentError> {
        self.access_token.as_deref().filter(|t| !t.is_empty()).ok_or(PaymentError::NotConfigured)
    }

    async fn read_json<T: serde::de::DeserializeOwned>(resp: reqwest::Response) -> Result<T, PaymentError> {
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(PaymentError::Api { status: status.as_u16(), body });
        }
        serde_json::from_str::<T>(&body).map_err(|e| PaymentError::InvalidResponse(format!("{e}; body={body}")))
    }
}

#[async_trait]
impl PaymentGateway for MercadoPagoClient {
    #[tracing::instrument(skip(self, request), fields(order_id = %request.external_reference))]
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference, PaymentError> {
        let token = self.token()?;
        let site = request.site_url.trim_end_matches('/');
        let mut items = Vec::with_capacity(request.items.len());
        for i in &request.items {
            let unit_price = i
                .unit_price
                .to_f64()
                .ok_or_else(|| PaymentError::InvalidResponse(format!("unit price {} is not representable", i.unit_price)))?;
            items.push(ItemBody { id: &i.id, title: &i.title, quantity: i.quantity, unit_price, currency_id: &self.currency });
        }

        let body = PreferenceBody {
            items,
            payer: PayerBody { name: &request.payer_name, email: &request.payer_email },
            back_urls: BackUrls {
                success: format!("{site}/payment/success"),
                failure: format!("{site}/payment/failure"),
                pending: format!("{site}/payment/pending"),
            },
            auto_return: "approved",
            external_reference: &request.external_reference,
            notification_url: self.notification_url.as_deref(),
        };

        let resp = self
            .http
            .post(format!("{}/checkout/preferences", self.api_url))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        let pref: PreferenceResponse = Self::read_json(resp).await?;
        tracing::info!(preference_id = %pref.id, "payment preference created");
        Ok(Preference { id: pref.id, init_point: pref.init_point })
    }

    #[tracing::instrument(skip(self))]
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PaymentError> {
        let token = self.token()?;
        let resp = self.http.get(format!("{}/v1/payments/{payment_id}", self.api_url)).bearer_auth(token).send().await?;
        let payment: PaymentResponse = Self::read_json(resp).await?;
        let id = match payment.id {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        Ok(PaymentInfo {
            id,
            status: PaymentStatus::parse(&payment.status),
            external_reference: payment.external_reference.filter(|r| !r.is_empty()),
        })
    }
}
