use axum::{extract::State, Json};
use serde::Deserialize;

use crate::domain::value_objects::Phone;
use crate::http::extract::ApiJson;
use crate::error::Result;
use crate::otp::{OtpIssued, VerificationToken};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendOtp {
    pub phone: Phone,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtp {
    pub phone: Phone,
    pub code: String,
}

pub async fn send_otp(State(s): State<AppState>, ApiJson(r): ApiJson<SendOtp>) -> Result<Json<OtpIssued>> {
    Ok(Json(s.otp.send(r.phone).await?))
}

pub async fn verify_otp(State(s): State<AppState>, ApiJson(r): ApiJson<VerifyOtp>) -> Result<Json<VerificationToken>> {
    Ok(Json(s.otp.verify(r.phone, &r.code).await?))
}
