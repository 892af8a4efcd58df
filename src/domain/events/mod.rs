//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::domain::aggregates::OrderStatus;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Product(ProductEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum OrderEvent {
    Created { order_id: Uuid, total: Decimal },
    Paid { order_id: Uuid, payment_id: String },
    StatusChanged { order_id: Uuid, status: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProductEvent {
    Sold { product_id: i64, order_id: Uuid },
}

impl DomainEvent {
    /// Bus subject, e.g. `storefront.order.paid`.
    pub fn subject(&self) -> String {
        let (entity, name) = match self {
            Self::Order(OrderEvent::Created { .. }) => ("order", "created"),
            Self::Order(OrderEvent::Paid { .. }) => ("order", "paid"),
            Self::Order(OrderEvent::StatusChanged { .. }) => ("order", "status_changed"),
            Self::Product(ProductEvent::Sold { .. }) => ("product", "sold"),
        };
        format!("storefront.{entity}.{name}")
    }
}

/// Publishes domain events to NATS when a client is configured.
#[derive(Clone, Default)]
pub struct EventPublisher { nats: Option<async_nats::Client> }

impl EventPublisher {
    pub fn new(nats: Option<async_nats::Client>) -> Self { Self { nats } }
    pub fn disabled() -> Self { Self::default() }

    pub async fn publish(&self, event: DomainEvent) {
        let Some(client) = &self.nats else { return };
        let subject = event.subject();
        let payload = match serde_json::to_vec(&event) {
            Ok(p) => p,
            Err(e) => { tracing::warn!(error = %e, %subject, "failed to encode domain event"); return; }
        };
        if let Err(e) = client.publish(subject.clone(), payload.into()).await {
            tracing::warn!(error = %e, %subject, "failed to publish domain event");
        }
    }

    pub async fn publish_all(&self, events: impl IntoIterator<Item = DomainEvent>) {
        for e in events { self.publish(e).await; }
    }
}
