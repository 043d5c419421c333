use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::domain::aggregates::{CartError, OrderError, ProductError};
use crate::domain::value_objects::ValueError;

#[derive(Error, Debug)]
pub enum ShopError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    /// A unique key is already taken; names the key.
    #[error("{0} already exists")]
    Duplicate(&'static str),

    #[error("admin authentication required")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    TooManyRequests(String),

    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Cart(#[from] CartError),

    #[error(transparent)]
    Product(#[from] ProductError),

    #[error(transparent)]
    Value(#[from] ValueError),

    #[error("payment signature verification failed")]
    PaymentVerification,

    #[error("payment gateway error: {0}")]
    Gateway(String),

    #[error("storage error: {0}")]
    Storage(String),
}

pub type Result<T> = std::result::Result<T, ShopError>;

impl ShopError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Validation(_) | Self::Cart(_) | Self::Product(_) | Self::Value(_) => "invalid_request",
            Self::Conflict(_) | Self::Duplicate(_) => "conflict",
            Self::Unauthorized => "unauthorized",
            Self::Forbidden(_) => "forbidden",
            Self::TooManyRequests(_) => "rate_limited",
            Self::Order(OrderError::IllegalTransition { .. }) => "illegal_transition",
            Self::Order(OrderError::CannotCancel(_)) => "not_cancellable",
            Self::Order(OrderError::AwaitingPayment | OrderError::PaymentNotPending(_)) => "payment_state",
            Self::Order(_) => "invalid_order",
            Self::PaymentVerification => "payment_verification_failed",
            Self::Gateway(_) => "gateway_error",
            Self::Storage(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Validation(_) | Self::Cart(_) | Self::Product(_) | Self::Value(_) | Self::PaymentVerification => StatusCode::BAD_REQUEST,
            Self::Conflict(_) | Self::Duplicate(_) => StatusCode::CONFLICT,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
            Self::Order(
                OrderError::IllegalTransition { .. }
                | OrderError::CannotCancel(_)
                | OrderError::AwaitingPayment
                | OrderError::PaymentNotPending(_),
            ) => StatusCode::CONFLICT,
            Self::Order(_) => StatusCode::BAD_REQUEST,
            Self::Gateway(_) => StatusCode::BAD_GATEWAY,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<validator::ValidationErrors> for ShopError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<sqlx::Error> for ShopError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => Self::Duplicate(unique_key(db.constraint())),
            _ => Self::Storage(e.to_string()),
        }
    }
}

/// Maps the unique constraints in `migrations/` to the key they guard.
pub(crate) fn unique_key(constraint: Option<&str>) -> &'static str {
    match constraint {
        Some("products_slug_key") => "product slug",
        Some("categories_slug_key") => "category slug",
        Some("orders_order_number_key") => "order number",
        Some("orders_gateway_order_id_key") => "gateway order",
        _ => "record",
    }
}

impl IntoResponse for ShopError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        // Storage details stay in the log.
        let message = match &self {
            Self::Storage(_) => "internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(json!({ "error": { "code": self.code(), "message": message } }))).into_response()
    }
}
