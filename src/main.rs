//! Divine Mahakal storefront API server

use anyhow::Result;
use std::sync::Arc;

use mahakal_store::otp::LogSmsSender;
use mahakal_store::payments::RazorpayGateway;
use mahakal_store::store::{MemoryStore, PgStore, Store};
use mahakal_store::{build_router, telemetry, AppState, Config, EventPublisher};

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init();
    let config = Config::from_env()?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => Arc::new(PgStore::connect(url).await?),
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    let gateway = Arc::new(RazorpayGateway::new(config.razorpay.clone())?);
    let events = EventPublisher::connect(config.nats_url.as_deref()).await;
    let port = config.port;
    let state = AppState::new(config, store, gateway, Arc::new(LogSmsSender), events);

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!("Divine Mahakal store listening on 0.0.0.0:{}", port);
    axum::serve(listener, app).await?;
    Ok(())
}
