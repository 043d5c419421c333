use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{banner, Banner, CategorySummary, Product};
use crate::domain::search::{self, SearchHit};
use crate::error::{Result, ShopError};
use crate::state::AppState;
use crate::store::ProductFilter;

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    /// Category id or slug.
    pub category: Option<String>,
    pub available: Option<bool>,
}

pub async fn list_products(State(s): State<AppState>, Query(q): Query<ProductQuery>) -> Result<Json<Vec<Product>>> {
    let category_id = match q.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(c) => Some(resolve_category(&s, c).await?),
        None => None,
    };
    let filter = ProductFilter { category_id, available_only: q.available.unwrap_or(false) };
    Ok(Json(s.store.list_products(&filter).await?))
}

async fn resolve_category(s: &AppState, key: &str) -> Result<Uuid> {
    let found = match Uuid::parse_str(key) {
        Ok(id) => s.store.get_category(id).await?,
        Err(_) => s.store.get_category_by_slug(key).await?,
    };
    found.map(|c| c.id).ok_or(ShopError::NotFound("category"))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<Uuid>) -> Result<Json<Product>> {
    s.store.get_product(id).await?.map(Json).ok_or(ShopError::NotFound("product"))
}

pub async fn get_product_by_slug(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<Product>> {
    s.store.get_product_by_slug(&slug).await?.map(Json).ok_or(ShopError::NotFound("product"))
}

pub(crate) async fn category_summaries(s: &AppState) -> Result<Vec<CategorySummary>> {
    let counts = s.store.category_product_counts().await?;
    let categories = s.store.list_categories().await?;
    Ok(categories
        .into_iter()
        .map(|c| {
            let n = counts.get(&c.id).copied().unwrap_or(0);
            c.with_count(n)
        })
        .collect())
}

pub async fn list_categories(State(s): State<AppState>) -> Result<Json<Vec<CategorySummary>>> {
    Ok(Json(category_summaries(&s).await?))
}

#[derive(Debug, Serialize)]
pub struct CategoryProducts {
    pub category: CategorySummary,
    pub products: Vec<Product>,
}

pub async fn category_products(State(s): State<AppState>, Path(slug): Path<String>) -> Result<Json<CategoryProducts>> {
    let category = s.store.get_category_by_slug(&slug).await?.ok_or(ShopError::NotFound("category"))?;
    let products = s.store.list_products(&ProductFilter { category_id: Some(category.id), available_only: false }).await?;
    let count = products.len() as u64;
    Ok(Json(CategoryProducts { category: category.with_count(count), products }))
}

#[derive(Debug, Serialize)]
pub struct AllData {
    pub categories: Vec<CategorySummary>,
    pub products: Vec<Product>,
}

/// Everything the storefront home page and client-side search need in one call.
pub async fn all_data(State(s): State<AppState>) -> Result<Json<AllData>> {
    let categories = category_summaries(&s).await?;
    let products = s.store.list_products(&ProductFilter::default()).await?;
    Ok(Json(AllData { categories, products }))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub limit: Option<usize>,
}

pub async fn search(State(s): State<AppState>, Query(q): Query<SearchQuery>) -> Result<Json<Vec<SearchHit>>> {
    if q.q.trim().is_empty() {
        return Ok(Json(vec![]));
    }
    let products = s.store.list_products(&ProductFilter::default()).await?;
    let names: HashMap<Uuid, String> = s.store.list_categories().await?.into_iter().map(|c| (c.id, c.name)).collect();
    let hits = search::search(&products, &names, &q.q, q.limit.unwrap_or(search::DEFAULT_LIMIT));
    tracing::debug!(query = %q.q, hits = hits.len(), "catalog search");
    Ok(Json(hits))
}

pub async fn list_banners(State(s): State<AppState>) -> Result<Json<Vec<Banner>>> {
    Ok(Json(banner::visible(s.store.list_banners().await?)))
}
