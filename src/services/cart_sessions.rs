use std::collections::HashMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::sync::RwLock;

use crate::domain::aggregates::Cart;

const DEFAULT_MAX_IDLE_HOURS: i64 = 24;
const DEFAULT_CAPACITY: usize = 10_000;

/// Carts keyed by browsing-session id, owned by the application state.
///
/// Carts untouched for longer than `max_idle` are dropped whenever a new
/// session starts; past `capacity` the least recently used cart goes first.
#[derive(Clone)]
pub struct CartSessions {
    carts: Arc<RwLock<HashMap<String, Cart>>>,
    currency: String,
    max_idle: Duration,
    capacity: usize,
}

impl CartSessions {
    pub fn new(currency: &str) -> Self {
        Self::with_limits(currency, Duration::hours(DEFAULT_MAX_IDLE_HOURS), DEFAULT_CAPACITY)
    }

    pub fn with_limits(currency: &str, max_idle: Duration, capacity: usize) -> Self {
        Self { carts: Arc::default(), currency: currency.to_string(), max_idle, capacity: capacity.max(1) }
    }

    /// Current cart for `session`; an unknown session reads as an empty cart.
    pub async fn snapshot(&self, session: &str) -> Cart {
        self.carts.read().await.get(session).cloned().unwrap_or_else(|| Cart::new(&self.currency))
    }

    /// Applies `f` to the session's cart, starting one if needed, and
    /// returns its result with the updated cart.
    pub async fn with_cart<R>(&self, session: &str, f: impl FnOnce(&mut Cart) -> R) -> (R, Cart) {
        let mut carts = self.carts.write().await;
        if !carts.contains_key(session) {
            self.make_room(&mut carts);
        }
        let cart = carts.entry(session.to_string()).or_insert_with(|| Cart::new(&self.currency));
        let out = f(cart);
        (out, cart.clone())
    }

    /// Applies `f` only if the session already has a cart.
    pub async fn with_existing_cart(&self, session: &str, f: impl FnOnce(&mut Cart)) -> Cart {
        let mut carts = self.carts.write().await;
        match carts.get_mut(session) {
            Some(cart) => {
                f(cart);
                cart.clone()
            }
            None => Cart::new(&self.currency),
        }
    }

    pub async fn clear(&self, session: &str) -> Cart {
        let mut carts = self.carts.write().await;
        carts.remove(session);
        Cart::new(&self.currency)
    }

    pub async fn len(&self) -> usize { self.carts.read().await.len() }

    fn make_room(&self, carts: &mut HashMap<String, Cart>) {
        let now = Utc::now();
        let before = carts.len();
        carts.retain(|_, cart| now.signed_duration_since(cart.updated_at()) < self.max_idle);

        while carts.len() >= self.capacity {
            let Some(oldest) = carts.iter().min_by_key(|(_, cart)| cart.updated_at()).map(|(id, _)| id.clone()) else {
                break;
            };
            carts.remove(&oldest);
        }

        let evicted = before - carts.len();
        if evicted > 0 {
            tracing::debug!(evicted, remaining = carts.len(), "evicted idle cart sessions");
        }
    }
}
