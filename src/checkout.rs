//! Order placement and the order/payment lifecycle.
//!
//! Online orders are persisted before the gateway order is created, so a
//! captured payment always has an order to attach to. Every later change goes
//! through [`mutate_order`], which retries on optimistic-lock conflicts so the
//! client confirmation and the gateway webhook can race safely.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{
    BasketLine, Cart, CartError, Order, OrderError, OrderKind, OrderStatus, PaymentMethod, PaymentStatus, Quote, ShippingAddress,
};
use crate::domain::value_objects::Phone;
use crate::error::{Result, ShopError};
use crate::payments::{WebhookEvent, WebhookPayment};
use crate::state::AppState;
use crate::store::OrderFilter;

const MAX_WRITE_ATTEMPTS: u32 = 3;
const CURRENCY: &str = "INR";

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct QuoteRequest {
    #[validate(length(min = 1, max = 50, message = "basket must have between 1 and 50 lines"))]
    pub items: Vec<BasketLine>,
    pub payment_method: PaymentMethod,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlaceOrderRequest {
    #[serde(default)]
    pub kind: OrderKind,
    #[validate(length(min = 1, max = 50, message = "basket must have between 1 and 50 lines"))]
    pub items: Vec<BasketLine>,
    pub shipping_address: ShippingAddress,
    pub payment_method: PaymentMethod,
    #[serde(default)]
    pub hamper_note: Option<String>,
}

/// What the browser needs to open the payment widget.
#[derive(Debug, Clone, Serialize)]
pub struct PaymentIntent {
    pub key_id: String,
    pub gateway_order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: Order,
    pub payment: Option<PaymentIntent>,
}

/// Prices `lines` against the live catalog.
pub async fn price_basket(state: &AppState, lines: &[BasketLine]) -> Result<Cart> {
    if lines.is_empty() {
        return Err(CartError::Empty.into());
    }
    let mut cart = Cart::new();
    for line in lines {
        let product = state.store.get_product(line.product_id).await?.ok_or(ShopError::NotFound("product"))?;
        cart.add_product(&product, line.quantity, line.color.as_deref())?;
    }
    Ok(cart)
}

pub async fn quote(state: &AppState, req: &QuoteRequest) -> Result<Quote> {
    req.validate()?;
    let cart = price_basket(state, &req.items).await?;
    Ok(cart.quote(req.payment_method, state.config.online_discount_percent))
}

/// Places an order for a shopper whose phone was verified as `verified`.
pub async fn place_order(state: &AppState, verified: &Phone, req: PlaceOrderRequest) -> Result<PlacedOrder> {
    req.validate()?;
    req.shipping_address.validate()?;
    if &req.shipping_address.phone != verified {
        return Err(ShopError::Forbidden("shipping phone does not match the verified number".into()));
    }
    let cart = price_basket(state, &req.items).await?;
    let quote = cart.quote(req.payment_method, state.config.online_discount_percent);
    let mut order = Order::place(req.kind, quote, req.shipping_address, req.hamper_note)?;
    insert_numbered(state, &mut order).await?;
    state.events.publish(order.take_events()).await;
    tracing::info!(order = %order.order_number, total = %order.total_amount, method = order.payment_method.as_str(), "order placed");

    if order.payment_method == PaymentMethod::Cod {
        return Ok(PlacedOrder { order, payment: None });
    }
    let (order, intent) = open_payment(state, order.id).await?;
    Ok(PlacedOrder { order, payment: Some(intent) })
}

/// Inserts `order`, drawing a new order number when the current one is taken.
async fn insert_numbered(state: &AppState, order: &mut Order) -> Result<()> {
    let mut attempt = 0;
    loop {
        attempt += 1;
        let inserted = state.store.insert_order(&*order).await;
        match inserted {
            Err(ShopError::Duplicate("order number")) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::warn!(order = %order.order_number, "order number collision, renumbering");
                order.renumber();
            }
            other => return other,
        }
    }
}

/// Returns the gateway order for a pending online order, creating it on first use.
/// An existing gateway order is reused so every payment against it still
/// finds this order.
pub async fn start_payment(state: &AppState, verified: &Phone, order_id: Uuid) -> Result<PaymentIntent> {
    load_owned(state, verified, order_id).await?;
    open_payment(state, order_id).await.map(|(_, intent)| intent)
}

async fn open_payment(state: &AppState, order_id: Uuid) -> Result<(Order, PaymentIntent)> {
    let order = state.store.get_order(order_id).await?.ok_or(ShopError::NotFound("order"))?;
    if order.payment_method != PaymentMethod::Online {
        return Err(OrderError::NotOnlinePayment.into());
    }
    if order.payment_status() != PaymentStatus::Pending || order.status() != OrderStatus::Pending {
        return Err(OrderError::PaymentNotPending(order.payment_status()).into());
    }
    if let Some(gateway_order_id) = order.gateway_order_id.clone() {
        let intent = PaymentIntent {
            key_id: state.gateway.key_id().to_string(),
            gateway_order_id,
            amount: order.total_amount.to_paise(),
            currency: CURRENCY.to_string(),
        };
        return Ok((order, intent));
    }
    let gateway_order = match state.gateway.create_order(order.total_amount.to_paise(), &order.order_number).await {
        Ok(g) => g,
        Err(e) => {
            tracing::error!(order = %order.order_number, error = %e, "gateway order creation failed");
            let marked = mutate_order(state, order_id, |o| {
                o.mark_payment_failed("gateway order creation failed")?;
                Ok(true)
            })
            .await;
            if let Err(mark_err) = marked {
                tracing::error!(order = %order.order_number, error = %mark_err, "could not mark order failed after gateway error");
            }
            return Err(e);
        }
    };
    let gateway_id = gateway_order.id.clone();
    let order = mutate_order(state, order_id, |o| {
        o.attach_gateway_order(gateway_id.clone())?;
        Ok(true)
    })
    .await?;
    let intent = PaymentIntent {
        key_id: state.gateway.key_id().to_string(),
        gateway_order_id: gateway_order.id,
        amount: gateway_order.amount,
        currency: gateway_order.currency,
    };
    Ok((order, intent))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConfirmPayment {
    pub order_id: Uuid,
    pub razorpay_order_id: String,
    pub razorpay_payment_id: String,
    pub razorpay_signature: String,
}

/// Client-side confirmation after the widget reports success.
pub async fn confirm_payment(state: &AppState, req: ConfirmPayment) -> Result<Order> {
    let order = state.store.get_order(req.order_id).await?.ok_or(ShopError::NotFound("order"))?;
    if order.gateway_order_id.as_deref() != Some(req.razorpay_order_id.as_str())
        || !state.gateway.verify_payment(&req.razorpay_order_id, &req.razorpay_payment_id, &req.razorpay_signature)
    {
        tracing::warn!(order = %order.order_number, "payment signature rejected");
        return Err(ShopError::PaymentVerification);
    }
    let paid = mutate_order(state, order.id, |o| Ok(o.mark_paid(&req.razorpay_payment_id)?)).await?;
    tracing::info!(order = %paid.order_number, payment = %req.razorpay_payment_id, "payment confirmed");
    Ok(paid)
}

/// Client-side report that the payment widget failed or was dismissed.
pub async fn record_payment_failure(state: &AppState, verified: &Phone, order_id: Uuid, reason: &str) -> Result<Order> {
    load_owned(state, verified, order_id).await?;
    mutate_order(state, order_id, |o| {
        o.mark_payment_failed(reason)?;
        Ok(true)
    })
    .await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookOutcome {
    Applied,
    AlreadyApplied,
    Ignored,
}

/// Applies a signed gateway webhook.
pub async fn handle_webhook(state: &AppState, body: &[u8], signature: &str) -> Result<WebhookOutcome> {
    if !state.gateway.verify_webhook(body, signature) {
        tracing::warn!("webhook signature rejected");
        return Err(ShopError::PaymentVerification);
    }
    let event: WebhookEvent = serde_json::from_slice(body).map_err(|e| ShopError::Validation(format!("malformed webhook: {e}")))?;
    let Some(payment) = event.payload.payment.map(|p| p.entity) else {
        return Ok(WebhookOutcome::Ignored);
    };
    match event.event.as_str() {
        "payment.captured" | "order.paid" => webhook_paid(state, payment).await,
        "payment.failed" => webhook_failed(state, payment).await,
        other => {
            tracing::debug!(event = other, "ignoring webhook event");
            Ok(WebhookOutcome::Ignored)
        }
    }
}

async fn order_for_payment(state: &AppState, payment: &WebhookPayment) -> Result<Option<Order>> {
    match &payment.order_id {
        Some(gateway_id) => state.store.find_order_by_gateway_id(gateway_id).await,
        None => Ok(None),
    }
}

async fn webhook_paid(state: &AppState, payment: WebhookPayment) -> Result<WebhookOutcome> {
    let Some(order) = order_for_payment(state, &payment).await? else {
        tracing::warn!(payment = %payment.id, "captured payment has no matching order");
        return Ok(WebhookOutcome::Ignored);
    };
    let mut changed = false;
    let result = mutate_order(state, order.id, |o| {
        changed = o.mark_paid(&payment.id)?;
        Ok(changed)
    })
    .await;
    match result {
        Ok(_) if changed => Ok(WebhookOutcome::Applied),
        Ok(_) => Ok(WebhookOutcome::AlreadyApplied),
        // e.g. a second capture for an order that is already paid or failed
        Err(ShopError::Order(e)) => {
            tracing::error!(order = %order.order_number, payment = %payment.id, error = %e, "captured payment could not be applied; needs manual reconciliation");
            Ok(WebhookOutcome::Ignored)
        }
        Err(e) => Err(e),
    }
}

async fn webhook_failed(state: &AppState, payment: WebhookPayment) -> Result<WebhookOutcome> {
    let Some(order) = order_for_payment(state, &payment).await? else {
        return Ok(WebhookOutcome::Ignored);
    };
    let reason = payment.error_description.unwrap_or_else(|| "payment failed".to_string());
    let result = mutate_order(state, order.id, |o| {
        o.mark_payment_failed(reason.clone())?;
        Ok(true)
    })
    .await;
    match result {
        Ok(_) => Ok(WebhookOutcome::Applied),
        Err(ShopError::Order(_)) => Ok(WebhookOutcome::AlreadyApplied),
        Err(e) => Err(e),
    }
}

pub async fn cancel_order(state: &AppState, verified: &Phone, order_id: Uuid) -> Result<Order> {
    load_owned(state, verified, order_id).await?;
    let order = mutate_order(state, order_id, |o| {
        o.cancel()?;
        Ok(true)
    })
    .await?;
    tracing::info!(order = %order.order_number, "order cancelled by customer");
    Ok(order)
}

pub async fn admin_set_status(state: &AppState, order_id: Uuid, status: OrderStatus) -> Result<Order> {
    let order = mutate_order(state, order_id, |o| {
        o.transition_to(status)?;
        Ok(true)
    })
    .await?;
    tracing::info!(order = %order.order_number, status = %status, "order status updated by admin");
    Ok(order)
}

pub async fn orders_for_phone(state: &AppState, phone: &Phone) -> Result<Vec<Order>> {
    state.store.list_orders(&OrderFilter { status: None, phone: Some(phone.clone()) }).await
}

/// Loads an order, hiding orders that belong to another phone.
pub async fn load_owned(state: &AppState, verified: &Phone, order_id: Uuid) -> Result<Order> {
    match state.store.get_order(order_id).await? {
        Some(order) if order.phone() == verified => Ok(order),
        _ => Err(ShopError::NotFound("order")),
    }
}

/// Read-modify-write with optimistic retry. `apply` returns whether it
/// changed anything; unchanged orders are not written.
async fn mutate_order<F>(state: &AppState, order_id: Uuid, mut apply: F) -> Result<Order>
where
    F: FnMut(&mut Order) -> Result<bool> + Send,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        let mut order = state.store.get_order(order_id).await?.ok_or(ShopError::NotFound("order"))?;
        if !apply(&mut order)? {
            return Ok(order);
        }
        match state.store.update_order(&mut order).await {
            Ok(()) => {
                state.events.publish(order.take_events()).await;
                return Ok(order);
            }
            Err(ShopError::Conflict(msg)) if attempt < MAX_WRITE_ATTEMPTS => {
                tracing::debug!(%msg, attempt, "retrying order write");
            }
            Err(e) => return Err(e),
        }
    }
}
