use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Request},
    http::{header::AUTHORIZATION, request::Parts},
    Json,
};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use crate::domain::value_objects::Phone;
use crate::error::ShopError;
use crate::state::AppState;

pub const VERIFICATION_HEADER: &str = "x-verification-token";

/// `Json` whose rejections use the API's error body.
pub struct ApiJson<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ShopError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ShopError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}

/// Present on requests carrying `Authorization: Bearer <admin token>`.
pub struct AdminAuth;

#[async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim);
        match presented {
            Some(token) if tokens_match(token, &state.config.admin_token) => Ok(AdminAuth),
            _ => {
                tracing::warn!(path = %parts.uri.path(), "rejected admin request");
                Err(ShopError::Unauthorized)
            }
        }
    }
}

fn tokens_match(a: &str, b: &str) -> bool {
    a.len() == b.len() && a.bytes().zip(b.bytes()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// The phone behind a live verification token.
pub struct VerifiedPhone(pub Phone);

#[async_trait]
impl FromRequestParts<AppState> for VerifiedPhone {
    type Rejection = ShopError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(VERIFICATION_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v.trim()).ok())
            .ok_or_else(|| ShopError::Forbidden("phone verification required".into()))?;
        state
            .otp
            .phone_for_token(token)
            .await
            .map(VerifiedPhone)
            .ok_or_else(|| ShopError::Forbidden("phone verification expired; verify again".into()))
    }
}
