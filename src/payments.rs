//! Razorpay integration.
//!
//! Orders are created server-side through the gateway API; the browser
//! checkout widget then returns `(order_id, payment_id, signature)` which is
//! checked here with the key secret.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use tracing::instrument;

use crate::config::RazorpayConfig;
use crate::error::{Result, ShopError};

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_ORDERS_URL: &str = "https://api.razorpay.com/v1/orders";

/// Gateway-side order the checkout widget pays against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Public key handed to the browser widget.
    fn key_id(&self) -> &str;
    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder>;
    fn verify_payment(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool;
    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool;
}

pub struct RazorpayGateway {
    http: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ShopError::Gateway(e.to_string()))?;
        Ok(Self { http, config })
    }
}

#[derive(Serialize)]
struct CreateOrderBody<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn key_id(&self) -> &str {
        &self.config.key_id
    }

    #[instrument(skip(self), fields(gateway = "razorpay"))]
    async fn create_order(&self, amount_paise: i64, receipt: &str) -> Result<GatewayOrder> {
        if self.config.key_id.is_empty() || self.config.key_secret.is_empty() {
            return Err(ShopError::Gateway("razorpay credentials are not configured".into()));
        }
        let resp = self
            .http
            .post(RAZORPAY_ORDERS_URL)
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(&CreateOrderBody { amount: amount_paise, currency: "INR", receipt })
            .send()
            .await
            .map_err(|e| ShopError::Gateway(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "razorpay rejected order creation");
            return Err(ShopError::Gateway(format!("razorpay returned {status}")));
        }
        resp.json::<GatewayOrder>().await.map_err(|e| ShopError::Gateway(e.to_string()))
    }

    fn verify_payment(&self, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
        verify_payment_signature(&self.config.key_secret, gateway_order_id, payment_id, signature)
    }

    fn verify_webhook(&self, body: &[u8], signature: &str) -> bool {
        match &self.config.webhook_secret {
            Some(secret) => verify_webhook_signature(secret, body, signature),
            None => false,
        }
    }
}

/// Hex HMAC-SHA256 of `message`.
pub fn sign(secret: &str, message: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(message);
    Some(hex::encode(mac.finalize().into_bytes()))
}

fn verify_hex(secret: &str, message: &[u8], signature: &str) -> bool {
    let Ok(expected) = hex::decode(signature.trim()) else { return false };
    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else { return false };
    mac.update(message);
    mac.verify_slice(&expected).is_ok()
}

/// Checkout signature: HMAC over `"{order_id}|{payment_id}"` with the key secret.
pub fn verify_payment_signature(secret: &str, gateway_order_id: &str, payment_id: &str, signature: &str) -> bool {
    if secret.is_empty() {
        return false;
    }
    verify_hex(secret, format!("{gateway_order_id}|{payment_id}").as_bytes(), signature)
}

/// Webhook signature: HMAC over the raw request body with the webhook secret.
pub fn verify_webhook_signature(secret: &str, body: &[u8], signature: &str) -> bool {
    !secret.is_empty() && verify_hex(secret, body, signature)
}

/// Subset of the webhook payload this service reacts to.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub payload: WebhookPayload,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<WebhookEntity<WebhookPayment>>,
}

#[derive(Debug, Deserialize)]
pub struct WebhookEntity<T> {
    pub entity: T,
}

#[derive(Debug, Deserialize)]
pub struct WebhookPayment {
    pub id: String,
    pub order_id: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}
