use axum::Router;

use crate::{
    api,
    config::AppConfig,
    domain::events::EventPublisher,
    error::Result,
    state::{AppState, Backends},
    store::{MemoryStore, PgStore},
};

pub async fn build(config: AppConfig) -> Result<Router> {
    let backends = match &config.database {
        Some(db) => Backends::with_store(&config, PgStore::connect(db).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using the in-memory store; data is lost on restart");
            Backends::with_store(&config, MemoryStore::new())
        }
    };

    if !config.payment.is_configured() {
        tracing::warn!("MERCADOPAGO_ACCESS_TOKEN not set, checkout and payment confirmation are disabled");
    }
    if config.supabase.jwt_secret.is_none() {
        tracing::warn!("SUPABASE_JWT_SECRET not set, no session will be accepted");
    }

    let events = EventPublisher::new(connect_nats(config.nats_url.as_deref()).await);
    let state = AppState::new(config, backends, events);
    api::router(state)
}

async fn connect_nats(url: Option<&str>) -> Option<async_nats::Client> {
    let url = url?;
    match async_nats::connect(url).await {
        Ok(client) => {
            tracing::info!(%url, "connected to NATS");
            Some(client)
        }
        Err(e) => {
            tracing::warn!(error = %e, %url, "NATS unavailable, domain events will not be published");
            None
        }
    }
}
