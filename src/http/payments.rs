use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::checkout::{self, ConfirmPayment, PaymentIntent, WebhookOutcome};
use crate::domain::aggregates::Order;
use crate::error::{Result, ShopError};
use crate::http::extract::{ApiJson, VerifiedPhone};
use crate::state::AppState;

const SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[derive(Debug, Deserialize)]
pub struct OrderRef {
    pub order_id: Uuid,
}

pub async fn create_payment(
    State(s): State<AppState>,
    VerifiedPhone(phone): VerifiedPhone,
    ApiJson(r): ApiJson<OrderRef>,
) -> Result<Json<PaymentIntent>> {
    Ok(Json(checkout::start_payment(&s, &phone, r.order_id).await?))
}

pub async fn verify_payment(State(s): State<AppState>, ApiJson(r): ApiJson<ConfirmPayment>) -> Result<Json<Order>> {
    Ok(Json(checkout::confirm_payment(&s, r).await?))
}

#[derive(Debug, Deserialize)]
pub struct PaymentFailure {
    pub order_id: Uuid,
    #[serde(default)]
    pub reason: Option<String>,
}

pub async fn payment_failed(
    State(s): State<AppState>,
    VerifiedPhone(phone): VerifiedPhone,
    ApiJson(r): ApiJson<PaymentFailure>,
) -> Result<Json<Order>> {
    let reason = r.reason.as_deref().unwrap_or("payment not completed");
    Ok(Json(checkout::record_payment_failure(&s, &phone, r.order_id, reason).await?))
}

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub outcome: WebhookOutcome,
}

pub async fn webhook(State(s): State<AppState>, headers: HeaderMap, body: Bytes) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(ShopError::PaymentVerification)?;
    let outcome = checkout::handle_webhook(&s, &body, signature).await?;
    Ok(Json(WebhookAck { outcome }))
}
