//! Catalog management for the admin panel.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Banner, BannerDraft, Category, CategoryDraft, Product, ProductDraft, ProductUpdate};
use crate::error::{Result, ShopError};
use crate::http::extract::{AdminAuth, ApiJson};
use crate::state::AppState;

async fn ensure_category(s: &AppState, id: Option<Uuid>) -> Result<()> {
    match id {
        Some(id) if s.store.get_category(id).await?.is_none() => Err(ShopError::NotFound("category")),
        _ => Ok(()),
    }
}

pub async fn create_product(_: AdminAuth, State(s): State<AppState>, ApiJson(draft): ApiJson<ProductDraft>) -> Result<(StatusCode, Json<Product>)> {
    ensure_category(&s, draft.category_id).await?;
    let product = Product::create(draft)?;
    s.store.insert_product(&product).await?;
    tracing::info!(product = %product.slug, "product created");
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    _: AdminAuth,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(update): ApiJson<ProductUpdate>,
) -> Result<Json<Product>> {
    ensure_category(&s, update.category_id).await?;
    let mut product = s.store.get_product(id).await?.ok_or(ShopError::NotFound("product"))?;
    product.apply(update)?;
    s.store.update_product(&product).await?;
    tracing::info!(product = %product.slug, "product updated");
    Ok(Json(product))
}

pub async fn delete_product(_: AdminAuth, State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !s.store.delete_product(id).await? {
        return Err(ShopError::NotFound("product"));
    }
    tracing::info!(product = %id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_category(_: AdminAuth, State(s): State<AppState>, ApiJson(draft): ApiJson<CategoryDraft>) -> Result<(StatusCode, Json<Category>)> {
    let category = Category::create(draft)?;
    s.store.insert_category(&category).await?;
    tracing::info!(category = %category.slug, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

pub async fn update_category(
    _: AdminAuth,
    State(s): State<AppState>,
    Path(id): Path<Uuid>,
    ApiJson(draft): ApiJson<CategoryDraft>,
) -> Result<Json<Category>> {
    let mut category = s.store.get_category(id).await?.ok_or(ShopError::NotFound("category"))?;
    category.rename(draft)?;
    s.store.update_category(&category).await?;
    Ok(Json(category))
}

pub async fn delete_category(_: AdminAuth, State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    let in_use = s.store.category_product_counts().await?.get(&id).copied().unwrap_or(0);
    if in_use > 0 {
        return Err(ShopError::Conflict(format!("category still has {in_use} products")));
    }
    if !s.store.delete_category(id).await? {
        return Err(ShopError::NotFound("category"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_banner(_: AdminAuth, State(s): State<AppState>, ApiJson(draft): ApiJson<BannerDraft>) -> Result<(StatusCode, Json<Banner>)> {
    draft.validate()?;
    let banner = Banner::create(draft);
    s.store.insert_banner(&banner).await?;
    Ok((StatusCode::CREATED, Json(banner)))
}

pub async fn delete_banner(_: AdminAuth, State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    if !s.store.delete_banner(id).await? {
        return Err(ShopError::NotFound("banner"));
    }
    Ok(StatusCode::NO_CONTENT)
}
