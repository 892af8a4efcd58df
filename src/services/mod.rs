//! Application services orchestrating domain, store and provider calls.

mod cart_sessions;
mod checkout;
mod confirmation;

pub use cart_sessions::CartSessions;
pub use checkout::{CheckoutOutcome, CheckoutService};
pub use confirmation::{ConfirmationOutcome, ConfirmationService, NotificationData, PaymentNotification};
