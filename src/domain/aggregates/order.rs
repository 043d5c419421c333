//! Order Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::{Validate, ValidationError};
use crate::domain::aggregates::cart::{CartItem, Quote};
use crate::domain::events::DomainEvent;
use crate::domain::value_objects::{not_blank, Money, Phone};

pub const MAX_HAMPER_NOTE_CHARS: usize = 500;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: Uuid,
    pub order_number: String,
    pub kind: OrderKind,
    pub items: Vec<LineItem>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    pub(crate) payment_status: PaymentStatus,
    pub(crate) status: OrderStatus,
    pub subtotal: Money,
    pub discount: Money,
    pub total_amount: Money,
    pub gateway_order_id: Option<String>,
    pub gateway_payment_id: Option<String>,
    pub hamper_note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Bumped by the store on every write.
    #[serde(skip)]
    pub(crate) version: i64,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Snapshot of a purchased product at order time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
    pub line_total: Money,
}

impl From<CartItem> for LineItem {
    fn from(i: CartItem) -> Self {
        let line_total = i.line_total();
        Self { product_id: i.product_id, name: i.name, image: i.image, color: i.color, quantity: i.quantity, unit_price: i.unit_price, line_total }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct ShippingAddress {
    #[validate(length(min = 1, max = 100, message = "recipient name is required"), custom = "not_blank")]
    pub name: String,
    pub phone: Phone,
    #[validate(length(min = 1, max = 200, message = "address line is required"), custom = "not_blank")]
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    #[validate(length(min = 1, max = 80, message = "city is required"), custom = "not_blank")]
    pub city: String,
    #[validate(length(min = 1, max = 80, message = "state is required"), custom = "not_blank")]
    pub state: String,
    #[validate(custom = "validate_pincode")]
    pub pincode: String,
}

fn validate_pincode(pin: &str) -> Result<(), ValidationError> {
    let ok = pin.len() == 6 && pin.bytes().all(|b| b.is_ascii_digit()) && !pin.starts_with('0');
    if ok { Ok(()) } else { Err(ValidationError::new("pincode must be 6 digits")) }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind { #[default] Cart, DirectBuy, Hamper }

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod { Cod, Online }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus { #[default] Pending, Paid, Failed, RefundPending }

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus { #[default] Pending, Processing, Shipped, Delivered, Cancelled, Failed }

impl OrderStatus {
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        use OrderStatus::*;
        matches!(
            (self, next),
            (Pending, Processing | Cancelled | Failed) | (Processing, Shipped | Cancelled) | (Shipped, Delivered)
        )
    }

    /// Customers may cancel until the parcel is dispatched.
    pub fn is_cancellable(self) -> bool { matches!(self, Self::Pending | Self::Processing) }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processing => "processing",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => Self::Pending,
            "processing" => Self::Processing,
            "shipped" => Self::Shipped,
            "delivered" => Self::Delivered,
            "cancelled" => Self::Cancelled,
            "failed" => Self::Failed,
            other => return Err(OrderError::UnknownStatus(other.to_string())),
        })
    }
}

impl PaymentStatus {
    pub fn as_str(self) -> &'static str {
        match self { Self::Pending => "pending", Self::Paid => "paid", Self::Failed => "failed", Self::RefundPending => "refund_pending" }
    }
}

impl FromStr for PaymentStatus {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => Self::Pending,
            "paid" => Self::Paid,
            "failed" => Self::Failed,
            "refund_pending" => Self::RefundPending,
            other => return Err(OrderError::UnknownStatus(other.to_string())),
        })
    }
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str { match self { Self::Cod => "cod", Self::Online => "online" } }
}

impl FromStr for PaymentMethod {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s { "cod" => Ok(Self::Cod), "online" => Ok(Self::Online), other => Err(OrderError::UnknownStatus(other.to_string())) }
    }
}

impl OrderKind {
    pub fn as_str(self) -> &'static str { match self { Self::Cart => "cart", Self::DirectBuy => "direct_buy", Self::Hamper => "hamper" } }
}

impl FromStr for OrderKind {
    type Err = OrderError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cart" => Ok(Self::Cart),
            "direct_buy" => Ok(Self::DirectBuy),
            "hamper" => Ok(Self::Hamper),
            other => Err(OrderError::UnknownStatus(other.to_string())),
        }
    }
}

impl Order {
    /// Builds a pending order from a priced basket.
    pub fn place(kind: OrderKind, quote: Quote, shipping_address: ShippingAddress, hamper_note: Option<String>) -> Result<Self, OrderError> {
        match (kind, quote.items.len()) {
            (_, 0) => return Err(OrderError::NoItems),
            (OrderKind::DirectBuy, n) if n != 1 => return Err(OrderError::DirectBuySingleItem),
            (OrderKind::Hamper, n) if n < 2 => return Err(OrderError::HamperTooSmall),
            _ => {}
        }
        let hamper_note = match kind {
            OrderKind::Hamper => hamper_note.map(|n| n.trim().to_string()).filter(|n| !n.is_empty()),
            _ => None,
        };
        if hamper_note.as_ref().is_some_and(|n| n.chars().count() > MAX_HAMPER_NOTE_CHARS) {
            return Err(OrderError::HamperNoteTooLong);
        }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(),
            order_number: new_order_number(),
            kind,
            items: quote.items.into_iter().map(LineItem::from).collect(),
            shipping_address,
            payment_method: quote.payment_method,
            payment_status: PaymentStatus::Pending,
            status: OrderStatus::Pending,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total_amount: quote.total,
            gateway_order_id: None,
            gateway_payment_id: None,
            hamper_note,
            created_at: now,
            updated_at: now,
            version: 0,
            events: vec![],
        };
        order.raise_event(DomainEvent::OrderPlaced {
            order_id: order.id,
            order_number: order.order_number.clone(),
            payment_method: order.payment_method,
            total: order.total_amount.amount(),
        });
        Ok(order)
    }

    pub fn status(&self) -> OrderStatus { self.status }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn phone(&self) -> &Phone { &self.shipping_address.phone }

    /// Admin-driven move along the fulfilment path.
    pub fn transition_to(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        let from = self.status;
        if !from.can_transition_to(next) { return Err(OrderError::IllegalTransition { from, to: next }); }
        // Online orders are only dispatched once paid.
        if self.payment_method == PaymentMethod::Online
            && self.payment_status != PaymentStatus::Paid
            && matches!(next, OrderStatus::Processing | OrderStatus::Shipped)
        {
            return Err(OrderError::AwaitingPayment);
        }
        self.status = next;
        if next == OrderStatus::Cancelled { self.flag_refund(); }
        self.touch();
        self.raise_event(DomainEvent::OrderStatusChanged { order_id: self.id, from, to: next });
        if next == OrderStatus::Cancelled {
            self.raise_event(DomainEvent::OrderCancelled { order_id: self.id, refund_due: self.payment_status == PaymentStatus::RefundPending });
        }
        Ok(())
    }

    /// Customer-initiated cancel.
    pub fn cancel(&mut self) -> Result<(), OrderError> {
        if !self.status.is_cancellable() { return Err(OrderError::CannotCancel(self.status)); }
        self.transition_to(OrderStatus::Cancelled)
    }

    pub fn attach_gateway_order(&mut self, gateway_order_id: impl Into<String>) -> Result<(), OrderError> {
        self.ensure_awaiting_online_payment()?;
        self.gateway_order_id = Some(gateway_order_id.into());
        self.touch();
        Ok(())
    }

    /// Returns `false` when this payment was already recorded.
    pub fn mark_paid(&mut self, payment_id: &str) -> Result<bool, OrderError> {
        if self.payment_status == PaymentStatus::Paid && self.gateway_payment_id.as_deref() == Some(payment_id) {
            return Ok(false);
        }
        self.ensure_awaiting_online_payment()?;
        self.payment_status = PaymentStatus::Paid;
        self.gateway_payment_id = Some(payment_id.to_string());
        self.raise_event(DomainEvent::OrderPaid { order_id: self.id, payment_id: payment_id.to_string() });
        if self.status == OrderStatus::Pending {
            self.status = OrderStatus::Processing;
            self.raise_event(DomainEvent::OrderStatusChanged { order_id: self.id, from: OrderStatus::Pending, to: OrderStatus::Processing });
        }
        self.touch();
        Ok(true)
    }

    pub fn mark_payment_failed(&mut self, reason: impl Into<String>) -> Result<(), OrderError> {
        self.ensure_awaiting_online_payment()?;
        self.payment_status = PaymentStatus::Failed;
        let from = self.status;
        if from == OrderStatus::Pending {
            self.status = OrderStatus::Failed;
            self.raise_event(DomainEvent::OrderStatusChanged { order_id: self.id, from, to: OrderStatus::Failed });
        }
        self.touch();
        self.raise_event(DomainEvent::PaymentFailed { order_id: self.id, reason: reason.into() });
        Ok(())
    }

    fn ensure_awaiting_online_payment(&self) -> Result<(), OrderError> {
        if self.payment_method != PaymentMethod::Online { return Err(OrderError::NotOnlinePayment); }
        if self.payment_status != PaymentStatus::Pending || self.status != OrderStatus::Pending {
            return Err(OrderError::PaymentNotPending(self.payment_status));
        }
        Ok(())
    }

    fn flag_refund(&mut self) {
        if self.payment_status == PaymentStatus::Paid { self.payment_status = PaymentStatus::RefundPending; }
    }

    /// Rebuilds an order read back from storage.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn restore(
        id: Uuid, order_number: String, kind: OrderKind, items: Vec<LineItem>, shipping_address: ShippingAddress,
        payment_method: PaymentMethod, payment_status: PaymentStatus, status: OrderStatus,
        subtotal: Money, discount: Money, total_amount: Money,
        gateway_order_id: Option<String>, gateway_payment_id: Option<String>, hamper_note: Option<String>,
        created_at: DateTime<Utc>, updated_at: DateTime<Utc>, version: i64,
    ) -> Self {
        Self {
            id, order_number, kind, items, shipping_address, payment_method, payment_status, status,
            subtotal, discount, total_amount, gateway_order_id, gateway_payment_id, hamper_note,
            created_at, updated_at, version, events: vec![],
        }
    }

    /// Draws a fresh order number, used when the store reports a collision.
    pub fn renumber(&mut self) { self.order_number = new_order_number(); }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn new_order_number() -> String { format!("DM-{:08X}", rand::random::<u32>()) }

#[derive(Debug, Clone, PartialEq)]
pub enum OrderError {
    NoItems,
    DirectBuySingleItem,
    HamperTooSmall,
    HamperNoteTooLong,
    CannotCancel(OrderStatus),
    IllegalTransition { from: OrderStatus, to: OrderStatus },
    AwaitingPayment,
    NotOnlinePayment,
    PaymentNotPending(PaymentStatus),
    UnknownStatus(String),
}
impl std::error::Error for OrderError {}
impl fmt::Display for OrderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoItems => write!(f, "order has no items"),
            Self::DirectBuySingleItem => write!(f, "direct buy takes exactly one product"),
            Self::HamperTooSmall => write!(f, "a hamper needs at least two products"),
            Self::HamperNoteTooLong => write!(f, "hamper note is limited to {MAX_HAMPER_NOTE_CHARS} characters"),
            Self::CannotCancel(s) => write!(f, "order cannot be cancelled once {s}"),
            Self::IllegalTransition { from, to } => write!(f, "cannot move order from {from} to {to}"),
            Self::AwaitingPayment => write!(f, "online order has not been paid yet"),
            Self::NotOnlinePayment => write!(f, "order is not an online payment order"),
            Self::PaymentNotPending(s) => write!(f, "payment is already {}", s.as_str()),
            Self::UnknownStatus(s) => write!(f, "unknown value: {s}"),
        }
    }
}
