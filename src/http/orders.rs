use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::checkout::{self, PlaceOrderRequest, PlacedOrder, QuoteRequest};
use crate::domain::aggregates::{Order, OrderStatus, Quote};
use crate::error::Result;
use crate::http::extract::{AdminAuth, ApiJson, VerifiedPhone};
use crate::state::AppState;
use crate::store::OrderFilter;

pub async fn quote(State(s): State<AppState>, ApiJson(r): ApiJson<QuoteRequest>) -> Result<Json<Quote>> {
    Ok(Json(checkout::quote(&s, &r).await?))
}

pub async fn create_order(
    State(s): State<AppState>,
    VerifiedPhone(phone): VerifiedPhone,
    ApiJson(r): ApiJson<PlaceOrderRequest>,
) -> Result<(StatusCode, Json<PlacedOrder>)> {
    let placed = checkout::place_order(&s, &phone, r).await?;
    Ok((StatusCode::CREATED, Json(placed)))
}

pub async fn my_orders(State(s): State<AppState>, VerifiedPhone(phone): VerifiedPhone) -> Result<Json<Vec<Order>>> {
    Ok(Json(checkout::orders_for_phone(&s, &phone).await?))
}

pub async fn get_order(State(s): State<AppState>, VerifiedPhone(phone): VerifiedPhone, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(checkout::load_owned(&s, &phone, id).await?))
}

pub async fn cancel_order(State(s): State<AppState>, VerifiedPhone(phone): VerifiedPhone, Path(id): Path<Uuid>) -> Result<Json<Order>> {
    Ok(Json(checkout::cancel_order(&s, &phone, id).await?))
}

#[derive(Debug, Deserialize)]
pub struct AdminOrderQuery {
    pub status: Option<OrderStatus>,
}

pub async fn admin_list_orders(_: AdminAuth, State(s): State<AppState>, Query(q): Query<AdminOrderQuery>) -> Result<Json<Vec<Order>>> {
    Ok(Json(s.store.list_orders(&OrderFilter { status: q.status, phone: None }).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
}

pub async fn admin_update_status(
    _: AdminAuth,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(r): ApiJson<StatusUpdate>,
) -> Result<Json<Order>> {
    Ok(Json(checkout::admin_set_status(&s, id, r.status).await?))
}
