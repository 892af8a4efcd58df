//! Value Objects for the storefront

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::num::IntErrorKind;
use thiserror::Error;

/// Money value object
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money { amount: Decimal, currency: String }

impl Money {
    pub fn new(amount: Decimal, currency: &str) -> Self { Self { amount, currency: currency.to_string() } }
    pub fn zero(currency: &str) -> Self { Self::new(Decimal::ZERO, currency) }
    pub fn amount(&self) -> Decimal { self.amount }
    pub fn currency(&self) -> &str { &self.currency }
    pub fn add(&self, other: &Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency { return Err(MoneyError::CurrencyMismatch); }
        Ok(Money::new(self.amount + other.amount, &self.currency))
    }
    pub fn multiply(&self, qty: Quantity) -> Money { Money::new(self.amount * Decimal::from(qty.value()), &self.currency) }
}

#[derive(Debug, Clone, Error)]
pub enum MoneyError {
    #[error("currency mismatch")]
    CurrencyMismatch,
}

/// Quantity of a cart or order line, between one and [`Quantity::MAX`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);
    /// Per-line shop limit.
    pub const MAX: Quantity = Quantity(99);

    /// Clamps any integer into `ONE..=MAX`.
    pub fn clamped(value: i64) -> Self {
        // MAX fits in u32, so the cast after clamping is lossless
        Self(value.clamp(i64::from(Self::ONE.0), i64::from(Self::MAX.0)) as u32)
    }

    /// Reads a quantity from loosely-typed input: numbers and numeric
    /// strings are accepted, everything else falls back to one.
    pub fn parse(raw: &serde_json::Value) -> Self {
        match raw {
            serde_json::Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64))
                .map(Self::clamped)
                .unwrap_or(Self::ONE),
            serde_json::Value::String(s) => Self::parse_str(s),
            _ => Self::ONE,
        }
    }

    pub fn parse_str(raw: &str) -> Self {
        // leading integer, like a form field would yield
        let trimmed = raw.trim();
        let end = trimmed
            .char_indices()
            .find(|(i, c)| !(c.is_ascii_digit() || (*i == 0 && (*c == '-' || *c == '+'))))
            .map(|(i, _)| i)
            .unwrap_or(trimmed.len());
        match trimmed[..end].parse::<i64>() {
            Ok(v) => Self::clamped(v),
            Err(e) if *e.kind() == IntErrorKind::PosOverflow => Self::MAX,
            Err(_) => Self::ONE,
        }
    }

    pub fn value(&self) -> u32 { self.0 }
    pub fn increment(&self) -> Self { Self(self.0.saturating_add(1).min(Self::MAX.0)) }
}

impl Default for Quantity { fn default() -> Self { Self::ONE } }

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;
    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            0 => Err(QuantityError::Zero),
            v if v > Self::MAX.0 => Err(QuantityError::TooLarge(Self::MAX.0)),
            v => Ok(Self(v)),
        }
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self { q.0 }
}

#[derive(Debug, Clone, Error)]
pub enum QuantityError {
    #[error("quantity must be at least 1")]
    Zero,
    #[error("quantity must be at most {0}")]
    TooLarge(u32),
}
