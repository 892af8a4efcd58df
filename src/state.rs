use std::sync::Arc;

use crate::auth::{IdentityProvider, SessionVerifier, SupabaseAuth};
use crate::config::AppConfig;
use crate::domain::events::EventPublisher;
use crate::payment::{MercadoPagoClient, PaymentGateway};
use crate::services::{CartSessions, CheckoutService, ConfirmationService};
use crate::storage::{FileStorage, SupabaseStorage};
use crate::store::{CatalogStore, OrderStore, ProfileStore};

/// External collaborators the application talks to.
#[derive(Clone)]
pub struct Backends {
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub payments: Arc<dyn PaymentGateway>,
    pub storage: Arc<dyn FileStorage>,
    pub identity: Arc<dyn IdentityProvider>,
}

impl Backends {
    /// Production HTTP clients on top of a single store implementation.
    pub fn with_store<S>(config: &AppConfig, store: S) -> Self
    where
        S: CatalogStore + OrderStore + ProfileStore + Clone,
    {
        Self {
            catalog: Arc::new(store.clone()),
            orders: Arc::new(store.clone()),
            profiles: Arc::new(store),
            payments: Arc::new(MercadoPagoClient::new(&config.payment)),
            storage: Arc::new(SupabaseStorage::new(&config.supabase)),
            identity: Arc::new(SupabaseAuth::new(&config.supabase)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub profiles: Arc<dyn ProfileStore>,
    pub storage: Arc<dyn FileStorage>,
    pub identity: Arc<dyn IdentityProvider>,
    pub sessions: SessionVerifier,
    pub carts: CartSessions,
    pub checkout: CheckoutService,
    pub confirmation: ConfirmationService,
    pub events: EventPublisher,
}

impl AppState {
    pub fn new(config: AppConfig, backends: Backends, events: EventPublisher) -> Self {
        let payment_configured = config.payment.is_configured();
        let checkout = CheckoutService::new(
            backends.orders.clone(),
            backends.payments.clone(),
            events.clone(),
            payment_configured,
            config.payment.public_key.clone(),
        );
        let confirmation =
            ConfirmationService::new(backends.orders.clone(), backends.payments.clone(), events.clone(), payment_configured);

        Self {
            sessions: SessionVerifier::new(config.supabase.jwt_secret.as_deref()),
            carts: CartSessions::new(&config.payment.currency),
            catalog: backends.catalog,
            orders: backends.orders,
            profiles: backends.profiles,
            storage: backends.storage,
            identity: backends.identity,
            checkout,
            confirmation,
            events,
            config: Arc::new(config),
        }
    }
}
