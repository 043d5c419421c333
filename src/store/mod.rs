//! Persistence seam.
//!
//! Handlers and services talk to a [`Store`]; `PgStore` backs production,
//! `MemoryStore` backs tests and database-less local runs.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::aggregates::{Banner, Category, Order, OrderStatus, Product, Review};
use crate::domain::value_objects::Phone;
use crate::error::Result;

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub category_id: Option<Uuid>,
    pub available_only: bool,
}

#[derive(Debug, Clone, Default)]
pub struct OrderFilter {
    pub status: Option<OrderStatus>,
    pub phone: Option<Phone>,
}

#[async_trait]
pub trait Store: Send + Sync {
    fn backend_tag(&self) -> &'static str;

    /// Newest first.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>>;
    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;
    /// Fails with `Duplicate` when the slug is taken.
    async fn insert_product(&self, product: &Product) -> Result<()>;
    async fn update_product(&self, product: &Product) -> Result<()>;
    /// Also removes the product's reviews.
    async fn delete_product(&self, id: Uuid) -> Result<bool>;

    /// Sorted by name.
    async fn list_categories(&self) -> Result<Vec<Category>>;
    async fn get_category(&self, id: Uuid) -> Result<Option<Category>>;
    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>>;
    async fn insert_category(&self, category: &Category) -> Result<()>;
    async fn update_category(&self, category: &Category) -> Result<()>;
    async fn delete_category(&self, id: Uuid) -> Result<bool>;
    async fn category_product_counts(&self) -> Result<HashMap<Uuid, u64>>;

    async fn insert_review(&self, review: &Review) -> Result<()>;
    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>>;

    async fn list_banners(&self) -> Result<Vec<Banner>>;
    async fn insert_banner(&self, banner: &Banner) -> Result<()>;
    async fn delete_banner(&self, id: Uuid) -> Result<bool>;

    /// Fails with `Duplicate("order number")` when the number is taken.
    async fn insert_order(&self, order: &Order) -> Result<()>;
    /// Optimistic write: fails with `Conflict` if the stored version moved
    /// since `order` was read, otherwise bumps `order`'s version.
    async fn update_order(&self, order: &mut Order) -> Result<()>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>>;
    async fn find_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>>;
    /// Newest first.
    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>>;
}
