//! Order Aggregate

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;
use validator::Validate;

use super::cart::Cart;
use crate::domain::value_objects::Quantity;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus { #[default] Pending, Paid, Shipped, Completed, Cancelled }

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [Self::Pending, Self::Paid, Self::Shipped, Self::Completed, Self::Cancelled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Paid => "paid",
            Self::Shipped => "shipped",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Re-applying the current status is always allowed.
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        *self == next
            || matches!(
                (self, next),
                (Pending, Paid) | (Pending, Cancelled) | (Paid, Shipped) | (Paid, Cancelled) | (Shipped, Completed)
            )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|st| st.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| OrderError::UnknownStatus(s.to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub total_price: Decimal,
    pub status: OrderStatus,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Immutable purchase line; `price` is the unit price at purchase time.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLine {
    pub id: i64,
    pub order_id: Uuid,
    pub product_id: i64,
    pub quantity: i32,
    pub price: Decimal,
}

impl OrderLine {
    pub fn subtotal(&self) -> Decimal { self.price * Decimal::from(self.quantity) }
}

/// Order line joined with the product it refers to, for order detail views.
#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct OrderLineDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub line: OrderLine,
    pub product_name: Option<String>,
    pub product_image_url: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderWithLines {
    #[serde(flatten)]
    pub order: Order,
    pub items: Vec<OrderLineDetail>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ContactDetails {
    #[validate(length(min = 1, message = "name is required"))]
    pub name: String,
    #[validate(email(message = "a valid email is required"))]
    pub email: String,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NewOrderLine {
    pub product_id: i64,
    pub title: String,
    pub quantity: Quantity,
    pub unit_price: Decimal,
}

impl NewOrderLine {
    pub fn subtotal(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity.value()) }
}

/// A pending order ready to be persisted together with its lines.
#[derive(Clone, Debug, PartialEq)]
pub struct NewOrder {
    pub id: Uuid,
    pub customer_name: String,
    pub customer_email: String,
    pub user_id: Option<Uuid>,
    pub total_price: Decimal,
    pub lines: Vec<NewOrderLine>,
}

impl NewOrder {
    pub fn from_cart(cart: &Cart, contact: &ContactDetails, user_id: Option<Uuid>) -> Result<Self, OrderError> {
        if cart.is_empty() { return Err(OrderError::EmptyCart); }
        let lines: Vec<NewOrderLine> = cart
            .lines()
            .iter()
            .map(|l| NewOrderLine { product_id: l.product_id, title: l.name.clone(), quantity: l.quantity, unit_price: l.unit_price.amount() })
            .collect();
        let total_price = cart.subtotal().amount();
        debug_assert_eq!(total_price, lines.iter().map(NewOrderLine::subtotal).sum::<Decimal>());
        Ok(Self {
            id: Uuid::new_v4(),
            customer_name: contact.name.trim().to_string(),
            customer_email: contact.email.trim().to_string(),
            user_id,
            total_price,
            lines,
        })
    }

}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("cart is empty")]
    EmptyCart,
    #[error("unknown order status '{0}'")]
    UnknownStatus(String),
    #[error("cannot move order from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::Product;

    fn product(id: i64, price: i64) -> Product {
        Product {
            id, name: format!("Joya {id}"), description: None, price: Decimal::new(price, 0),
            image_url: None, is_sold: false, collection: None, created_at: Utc::now(),
        }
    }

    fn contact() -> ContactDetails { ContactDetails { name: "Paula Rodríguez".into(), email: "paula@example.com".into() } }

    #[test]
    fn test_new_order_from_cart() {
        let mut cart = Cart::new("ARS");
        cart.add(&product(1, 25000));
        cart.add(&product(1, 25000));
        cart.add(&product(2, 18500));
        let order = NewOrder::from_cart(&cart, &contact(), None).unwrap();
        assert_eq!(order.total_price, Decimal::new(68500, 0));
        assert_eq!(order.lines.len(), 2);
        assert_eq!(order.lines[0].quantity.value(), 2);
        assert_eq!(order.lines[1].quantity.value(), 1);
        assert_eq!(order.total_price, order.lines.iter().map(NewOrderLine::subtotal).sum::<Decimal>());
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let cart = Cart::new("ARS");
        assert_eq!(NewOrder::from_cart(&cart, &contact(), None), Err(OrderError::EmptyCart));
    }

    #[test]
    fn test_status_parsing_and_transitions() {
        assert_eq!("PAID".parse::<OrderStatus>().unwrap(), OrderStatus::Paid);
        assert!("refunded".parse::<OrderStatus>().is_err());
        assert!(OrderStatus::Pending.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Paid.can_transition_to(OrderStatus::Paid));
        assert!(OrderStatus::Shipped.can_transition_to(OrderStatus::Completed));
        assert!(!OrderStatus::Cancelled.can_transition_to(OrderStatus::Paid));
        assert!(!OrderStatus::Completed.can_transition_to(OrderStatus::Pending));
    }

    #[test]
    fn test_contact_validation() {
        assert!(contact().validate().is_ok());
        let bad = ContactDetails { name: "".into(), email: "not-an-email".into() };
        let errs = bad.validate().unwrap_err();
        assert!(errs.field_errors().contains_key("name"));
        assert!(errs.field_errors().contains_key("email"));
    }
}
