use std::sync::Arc;

use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Cart, ContactDetails, NewOrder, Order, OrderStatus};
use crate::domain::events::{DomainEvent, EventPublisher, OrderEvent};
use crate::error::{AppError, Result};
use crate::payment::{PaymentGateway, PreferenceItem, PreferenceRequest};
use crate::store::OrderStore;

#[derive(Clone, Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckoutOutcome {
    EmptyCart,
    Ready {
        order: Order,
        preference_id: String,
        init_point: String,
        /// Key for the embedded payment widget.
        public_key: Option<String>,
    },
}

/// Turns a cart into a pending order plus a provider payment preference.
#[derive(Clone)]
pub struct CheckoutService {
    orders: Arc<dyn OrderStore>,
    payments: Arc<dyn PaymentGateway>,
    events: EventPublisher,
    payment_configured: bool,
    public_key: Option<String>,
}

impl CheckoutService {
    pub fn new(
        orders: Arc<dyn OrderStore>,
        payments: Arc<dyn PaymentGateway>,
        events: EventPublisher,
        payment_configured: bool,
        public_key: Option<String>,
    ) -> Self {
        Self { orders, payments, events, payment_configured, public_key }
    }

    /// The cart is left untouched; it is only cleared once the buyer lands
    /// on the success page.
    #[instrument(skip(self, cart, contact), fields(lines = cart.lines().len()))]
    pub async fn checkout(
        &self,
        cart: &Cart,
        contact: &ContactDetails,
        user_id: Option<Uuid>,
        site_url: &str,
    ) -> Result<CheckoutOutcome> {
        if cart.is_empty() {
            return Ok(CheckoutOutcome::EmptyCart);
        }
        contact.validate()?;
        if !self.payment_configured {
            return Err(AppError::Config("payment provider access token is not configured".to_string()));
        }

        let new_order = NewOrder::from_cart(cart, contact, user_id)?;
        let order = self.orders.create_order(&new_order).await.map_err(|e| {
            tracing::error!(error = %e, "failed to create order");
            e
        })?;
        tracing::info!(order_id = %order.id, total = %order.total_price, "order created");
        self.events.publish(DomainEvent::Order(OrderEvent::Created { order_id: order.id, total: order.total_price })).await;

        let request = PreferenceRequest {
            items: new_order
                .lines
                .iter()
                .map(|l| PreferenceItem {
                    id: l.product_id.to_string(),
                    title: l.title.clone(),
                    quantity: l.quantity.value(),
                    unit_price: l.unit_price,
                })
                .collect(),
            payer_name: new_order.customer_name.clone(),
            payer_email: new_order.customer_email.clone(),
            site_url: site_url.to_string(),
            external_reference: order.id.to_string(),
        };

        let preference = match self.payments.create_preference(request).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(order_id = %order.id, error = %e, "payment preference failed, cancelling order");
                if let Err(ce) = self.orders.set_status(order.id, OrderStatus::Cancelled).await {
                    tracing::error!(order_id = %order.id, error = %ce, "failed to cancel order after preference failure");
                }
                return Err(e.into());
            }
        };

        Ok(CheckoutOutcome::Ready {
            order,
            preference_id: preference.id,
            init_point: preference.init_point,
            public_key: self.public_key.clone(),
        })
    }
}
