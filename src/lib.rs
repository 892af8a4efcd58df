//! Jewelry storefront backend
//!
//! Single-merchant shop for unique pieces: every product is sold at most once.
//!
//! ## Features
//! - Product catalog with collections and search
//! - Per-session shopping carts
//! - Checkout through a hosted payment provider
//! - Payment confirmation webhook (marks orders paid and pieces sold)
//! - Customer accounts with order history
//! - Back office for products, images and fulfilment

pub mod api;
pub mod app;
pub mod auth;
pub mod config;
pub mod domain;
pub mod error;
pub mod payment;
pub mod services;
pub mod state;
pub mod storage;
pub mod store;

pub use config::AppConfig;
pub use domain::aggregates::{Cart, CartLine, Order, OrderStatus, Product};
pub use domain::value_objects::{Money, Quantity};
pub use error::{AppError, Result};
pub use state::{AppState, Backends};
