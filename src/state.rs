use std::sync::Arc;

use crate::config::Config;
use crate::domain::events::DomainEvent;
use crate::otp::{OtpService, SmsSender};
use crate::payments::PaymentGateway;
use crate::store::Store;

const SUBJECT_PREFIX: &str = "mahakal";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub otp: Arc<OtpService>,
    pub events: EventPublisher,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        gateway: Arc<dyn PaymentGateway>,
        sms: Arc<dyn SmsSender>,
        events: EventPublisher,
    ) -> Self {
        let otp = Arc::new(OtpService::new(config.otp.clone(), sms));
        Self { store, gateway, otp, events, config: Arc::new(config) }
    }
}

/// Fans domain events out to NATS when connected; always logs them.
#[derive(Clone, Default)]
pub struct EventPublisher {
    nats: Option<async_nats::Client>,
}

impl EventPublisher {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A failed connection is logged and leaves publishing disabled.
    pub async fn connect(url: Option<&str>) -> Self {
        let Some(url) = url else { return Self::disabled() };
        match async_nats::connect(url).await {
            Ok(client) => {
                tracing::info!(%url, "connected to NATS");
                Self { nats: Some(client) }
            }
            Err(e) => {
                tracing::warn!(%url, error = %e, "NATS unavailable, events will only be logged");
                Self::disabled()
            }
        }
    }

    pub async fn publish(&self, events: Vec<DomainEvent>) {
        for event in events {
            tracing::info!(subject = event.subject(), event = ?event, "domain event");
            let Some(client) = &self.nats else { continue };
            let payload = match serde_json::to_vec(&event) {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to encode event");
                    continue;
                }
            };
            let subject = format!("{SUBJECT_PREFIX}.{}", event.subject());
            if let Err(e) = client.publish(subject, payload.into()).await {
                tracing::warn!(error = %e, "failed to publish event");
            }
        }
    }
}
