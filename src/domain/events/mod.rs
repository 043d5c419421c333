//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::order::{OrderStatus, PaymentMethod};

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    OrderPlaced { order_id: Uuid, order_number: String, payment_method: PaymentMethod, total: Decimal },
    OrderPaid { order_id: Uuid, payment_id: String },
    OrderStatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
    OrderCancelled { order_id: Uuid, refund_due: bool },
    PaymentFailed { order_id: Uuid, reason: String },
}

impl DomainEvent {
    /// NATS subject suffix, e.g. `orders.placed`.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::OrderPlaced { .. } => "orders.placed",
            Self::OrderPaid { .. } => "orders.paid",
            Self::OrderStatusChanged { .. } => "orders.status_changed",
            Self::OrderCancelled { .. } => "orders.cancelled",
            Self::PaymentFailed { .. } => "orders.payment_failed",
        }
    }
}
