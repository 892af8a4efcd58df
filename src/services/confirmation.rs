use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use crate::domain::events::{DomainEvent, EventPublisher, OrderEvent, ProductEvent};
use crate::error::{AppError, Result};
use crate::payment::{PaymentGateway, PaymentStatus};
use crate::store::{OrderStore, PaymentApplication};

/// Provider notification body: `{ "type": "payment", "data": { "id": ... } }`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PaymentNotification {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub data: Option<NotificationData>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NotificationData {
    /// Sent as a number or a string depending on the notification version.
    #[serde(default)]
    pub id: serde_json::Value,
}

impl PaymentNotification {
    pub fn payment_id(&self) -> Option<String> {
        match &self.data.as_ref()?.id {
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ConfirmationOutcome {
    Ignored,
    NotApproved { status: PaymentStatus },
    Applied { order_id: Uuid, sold_product_ids: Vec<i64> },
    AlreadyProcessed,
}

/// The only path that marks orders paid and products sold.
#[derive(Clone)]
pub struct ConfirmationService {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    events: EventPublisher,
    payment_configured: bool,
}

impl ConfirmationService {
    pub fn new(orders: Arc<dyn OrderStore>, payments: Arc<dyn PaymentGateway>, events: EventPublisher, payment_configured: bool) -> Self {
        Self { orders, payments, events, payment_configured }
    }

    #[instrument(skip(self, notification), fields(kind = ?notification.kind))]
    pub async fn handle(&self, notification: &PaymentNotification) -> Result<ConfirmationOutcome> {
        if notification.kind.as_deref() != Some("payment") {
            return Ok(ConfirmationOutcome::Ignored);
        }
        if !self.payment_configured {
            return Err(AppError::Config("payment provider access token is not configured".to_string()));
        }
        let payment_id = notification
            .payment_id()
            .ok_or_else(|| AppError::Internal("payment notification carries no payment id".to_string()))?;

        let payment = self.payments.get_payment(&payment_id).await?;
        if !payment.status.is_approved() {
            tracing::info!(%payment_id, status = ?payment.status, "payment not approved, nothing to apply");
            return Ok(ConfirmationOutcome::NotApproved { status: payment.status });
        }

        let reference = payment
            .external_reference
            .as_deref()
            .ok_or_else(|| AppError::Internal(format!("payment {payment_id} has no external reference")))?;
        let order_id = reference
            .parse::<Uuid>()
            .map_err(|_| AppError::Internal(format!("payment {payment_id} references unknown order '{reference}'")))?;

        match self.orders.apply_payment(&payment_id, order_id).await? {
            PaymentApplication::Applied { order, sold_product_ids } => {
                tracing::info!(%payment_id, order_id = %order.id, sold = sold_product_ids.len(), "payment applied");
                let mut events = vec![DomainEvent::Order(OrderEvent::Paid { order_id: order.id, payment_id: payment_id.clone() })];
                events.extend(
                    sold_product_ids.iter().map(|&product_id| DomainEvent::Product(ProductEvent::Sold { product_id, order_id: order.id })),
                );
                self.events.publish_all(events).await;
                Ok(ConfirmationOutcome::Applied { order_id: order.id, sold_product_ids })
            }
            PaymentApplication::AlreadyProcessed => {
                tracing::info!(%payment_id, %order_id, "payment already applied");
                Ok(ConfirmationOutcome::AlreadyProcessed)
            }
            PaymentApplication::OrderMissing => Err(AppError::Internal(format!("order {order_id} for payment {payment_id} not found"))),
        }
    }
}
