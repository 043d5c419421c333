use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{OrderFilter, ProductFilter, Store};
use crate::domain::aggregates::{Banner, Category, Order, Product, Review};
use crate::error::{Result, ShopError};

#[derive(Default)]
pub struct MemoryStore {
    products: Mutex<HashMap<Uuid, Product>>,
    categories: Mutex<HashMap<Uuid, Category>>,
    reviews: Mutex<Vec<Review>>,
    banners: Mutex<HashMap<Uuid, Banner>>,
    orders: Mutex<HashMap<Uuid, Order>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}


#[async_trait]
impl Store for MemoryStore {
    fn backend_tag(&self) -> &'static str {
        "memory"
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let mut out: Vec<Product> = self
            .products
            .lock()
            .await
            .values()
            .filter(|p| filter.category_id.map_or(true, |c| p.category_id == Some(c)))
            .filter(|p| !filter.available_only || p.available)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(out)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        Ok(self.products.lock().await.get(&id).cloned())
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        Ok(self.products.lock().await.values().find(|p| p.slug.as_str() == slug).cloned())
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.lock().await;
        if products.values().any(|p| p.slug == product.slug) {
            return Err(ShopError::Duplicate("product slug"));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        let mut products = self.products.lock().await;
        if !products.contains_key(&product.id) {
            return Err(ShopError::NotFound("product"));
        }
        if products.values().any(|p| p.id != product.id && p.slug == product.slug) {
            return Err(ShopError::Duplicate("product slug"));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let removed = self.products.lock().await.remove(&id).is_some();
        if removed {
            self.reviews.lock().await.retain(|r| r.product_id != id);
        }
        Ok(removed)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let mut out: Vec<Category> = self.categories.lock().await.values().cloned().collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(out)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        Ok(self.categories.lock().await.get(&id).cloned())
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        Ok(self.categories.lock().await.values().find(|c| c.slug.as_str() == slug).cloned())
    }

    async fn insert_category(&self, category: &Category) -> Result<()> {
        let mut categories = self.categories.lock().await;
        if categories.values().any(|c| c.slug == category.slug) {
            return Err(ShopError::Duplicate("category slug"));
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn update_category(&self, category: &Category) -> Result<()> {
        let mut categories = self.categories.lock().await;
        if !categories.contains_key(&category.id) {
            return Err(ShopError::NotFound("category"));
        }
        if categories.values().any(|c| c.id != category.id && c.slug == category.slug) {
            return Err(ShopError::Duplicate("category slug"));
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        Ok(self.categories.lock().await.remove(&id).is_some())
    }

    async fn category_product_counts(&self) -> Result<HashMap<Uuid, u64>> {
        let mut counts = HashMap::new();
        for category_id in self.products.lock().await.values().filter_map(|p| p.category_id) {
            *counts.entry(category_id).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn insert_review(&self, review: &Review) -> Result<()> {
        self.reviews.lock().await.push(review.clone());
        Ok(())
    }

    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        Ok(self.reviews.lock().await.iter().filter(|r| r.product_id == product_id).cloned().collect())
    }

    async fn list_banners(&self) -> Result<Vec<Banner>> {
        Ok(self.banners.lock().await.values().cloned().collect())
    }

    async fn insert_banner(&self, banner: &Banner) -> Result<()> {
        self.banners.lock().await.insert(banner.id, banner.clone());
        Ok(())
    }

    async fn delete_banner(&self, id: Uuid) -> Result<bool> {
        Ok(self.banners.lock().await.remove(&id).is_some())
    }

    async fn insert_order(&self, order: &Order) -> Result<()> {
        let mut orders = self.orders.lock().await;
        if orders.contains_key(&order.id) {
            return Err(ShopError::Conflict(format!("order {} already exists", order.id)));
        }
        if orders.values().any(|o| o.order_number == order.order_number) {
            return Err(ShopError::Duplicate("order number"));
        }
        let mut stored = order.clone();
        stored.take_events();
        orders.insert(order.id, stored);
        Ok(())
    }

    async fn update_order(&self, order: &mut Order) -> Result<()> {
        let mut orders = self.orders.lock().await;
        let current = orders.get(&order.id).ok_or(ShopError::NotFound("order"))?;
        if current.version != order.version {
            return Err(ShopError::Conflict(format!("order {} was modified concurrently", order.order_number)));
        }
        order.version += 1;
        let mut stored = order.clone();
        stored.take_events();
        orders.insert(order.id, stored);
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.lock().await.get(&id).cloned())
    }

    async fn find_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        Ok(self
            .orders
            .lock()
            .await
            .values()
            .find(|o| o.gateway_order_id.as_deref() == Some(gateway_order_id))
            .cloned())
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let mut out: Vec<Order> = self
            .orders
            .lock()
            .await
            .values()
            .filter(|o| filter.status.map_or(true, |s| o.status() == s))
            .filter(|o| filter.phone.as_ref().map_or(true, |p| o.phone() == p))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        Ok(out)
    }
}
