//! Cart Aggregate

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::product::Product;
use crate::domain::value_objects::{Money, Quantity};

/// In-memory cart for one browsing session. All operations are total.
#[derive(Clone, Debug, Serialize)]
pub struct Cart {
    lines: Vec<CartLine>,
    count: u32,
    subtotal: Money,
    currency: String,
    updated_at: DateTime<Utc>,
}

/// Product snapshot taken when the item was added, plus its quantity.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CartLine {
    pub product_id: i64,
    pub name: String,
    pub image_url: Option<String>,
    pub unit_price: Money,
    pub quantity: Quantity,
}

impl CartLine {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

impl Cart {
    pub fn new(currency: &str) -> Self {
        Self { lines: vec![], count: 0, subtotal: Money::zero(currency), currency: currency.to_string(), updated_at: Utc::now() }
    }

    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn count(&self) -> u32 { self.count }
    pub fn subtotal(&self) -> &Money { &self.subtotal }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn quantity_of(&self, product_id: i64) -> Option<Quantity> {
        self.lines.iter().find(|l| l.product_id == product_id).map(|l| l.quantity)
    }

    pub fn add(&mut self, product: &Product) {
        if let Some(existing) = self.lines.iter_mut().find(|l| l.product_id == product.id) {
            existing.quantity = existing.quantity.increment();
        } else {
            self.lines.push(CartLine {
                product_id: product.id,
                name: product.name.clone(),
                image_url: product.image_url.clone(),
                unit_price: Money::new(product.price, &self.currency),
                quantity: Quantity::ONE,
            });
        }
        self.recalculate();
    }

    pub fn remove(&mut self, product_id: i64) {
        self.lines.retain(|l| l.product_id != product_id);
        self.recalculate();
    }

    /// Sets the quantity of an existing line; unknown products are ignored.
    pub fn update_quantity(&mut self, product_id: i64, quantity: Quantity) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.product_id == product_id) {
            line.quantity = quantity;
        }
        self.recalculate();
    }

    pub fn clear(&mut self) { self.lines.clear(); self.recalculate(); }

    fn recalculate(&mut self) {
        self.count = self.lines.iter().fold(0u32, |acc, l| acc.saturating_add(l.quantity.value()));
        self.subtotal = self.lines.iter().fold(Money::zero(&self.currency), |acc, l| acc.add(&l.line_total()).unwrap_or(acc));
        self.updated_at = Utc::now();
    }
}
