//! Hosted payment provider seam.
//!
//! Checkout asks the provider for a payment preference and the webhook
//! fetches the authoritative payment status back.

mod mercadopago;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use mercadopago::MercadoPagoClient;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("provider api error status={status} body={body}")]
    Api { status: u16, body: String },
    #[error("invalid provider response: {0}")]
    InvalidResponse(String),
    #[error("payment provider is not configured")]
    NotConfigured,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreferenceItem {
    pub id: String,
    pub title: String,
    pub quantity: u32,
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, PartialEq)]
pub struct PreferenceRequest {
    pub items: Vec<PreferenceItem>,
    pub payer_name: String,
    pub payer_email: String,
    /// Base the success/failure/pending return URLs are built from.
    pub site_url: String,
    pub external_reference: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preference {
    pub id: String,
    pub init_point: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Approved,
    Pending,
    InProcess,
    Rejected,
    Cancelled,
    Refunded,
    Other(String),
}

impl PaymentStatus {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "approved" => Self::Approved,
            "pending" => Self::Pending,
            "in_process" => Self::InProcess,
            "rejected" => Self::Rejected,
            "cancelled" => Self::Cancelled,
            "refunded" => Self::Refunded,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn is_approved(&self) -> bool { matches!(self, Self::Approved) }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PaymentInfo {
    pub id: String,
    pub status: PaymentStatus,
    pub external_reference: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync + 'static {
    async fn create_preference(&self, request: PreferenceRequest) -> Result<Preference, PaymentError>;
    async fn get_payment(&self, payment_id: &str) -> Result<PaymentInfo, PaymentError>;
}
