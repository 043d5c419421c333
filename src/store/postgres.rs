use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

use super::{OrderFilter, ProductFilter, Store};
use crate::domain::aggregates::{Banner, Category, ColorVariant, LineItem, Order, Product, Review, ShippingAddress};
use crate::domain::value_objects::{Money, Rating, Slug};
use crate::error::{Result, ShopError};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and applies pending migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new().max_connections(10).connect(database_url).await?;
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn corrupt(what: &str, e: impl std::fmt::Display) -> ShopError {
    ShopError::Storage(format!("corrupt {what} row: {e}"))
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    name: String,
    slug: String,
    description: String,
    price: Decimal,
    discounted_price: Option<Decimal>,
    images: Vec<String>,
    category_id: Option<Uuid>,
    available: bool,
    colors: Json<Vec<ColorVariant>>,
    material: Option<String>,
    warranty: Option<String>,
    return_policy: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = ShopError;
    fn try_from(r: ProductRow) -> Result<Self> {
        Ok(Product {
            id: r.id,
            name: r.name,
            slug: Slug::parse(&r.slug).map_err(|e| corrupt("product", e))?,
            description: r.description,
            price: Money::new(r.price).map_err(|e| corrupt("product", e))?,
            discounted_price: r.discounted_price.map(Money::new).transpose().map_err(|e| corrupt("product", e))?,
            images: r.images,
            category_id: r.category_id,
            available: r.available,
            colors: r.colors.0,
            material: r.material,
            warranty: r.warranty,
            return_policy: r.return_policy,
            created_at: r.created_at,
            updated_at: r.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    slug: String,
    image: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<CategoryRow> for Category {
    type Error = ShopError;
    fn try_from(r: CategoryRow) -> Result<Self> {
        Ok(Category { id: r.id, name: r.name, slug: Slug::parse(&r.slug).map_err(|e| corrupt("category", e))?, image: r.image, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: Uuid,
    product_id: Uuid,
    name: String,
    review: String,
    rating: i16,
    created_at: DateTime<Utc>,
}

impl TryFrom<ReviewRow> for Review {
    type Error = ShopError;
    fn try_from(r: ReviewRow) -> Result<Self> {
        let rating = u8::try_from(r.rating).map_err(|e| corrupt("review", e)).and_then(|v| Rating::new(v).map_err(|e| corrupt("review", e)))?;
        Ok(Review { id: r.id, product_id: r.product_id, name: r.name, review: r.review, rating, created_at: r.created_at })
    }
}

#[derive(sqlx::FromRow)]
struct BannerRow {
    id: Uuid,
    title: String,
    image: String,
    link: Option<String>,
    position: i32,
    active: bool,
}

impl From<BannerRow> for Banner {
    fn from(r: BannerRow) -> Self {
        Banner { id: r.id, title: r.title, image: r.image, link: r.link, position: r.position, active: r.active }
    }
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    kind: String,
    items: Json<Vec<LineItem>>,
    shipping_address: Json<ShippingAddress>,
    payment_method: String,
    payment_status: String,
    status: String,
    subtotal: Decimal,
    discount: Decimal,
    total_amount: Decimal,
    gateway_order_id: Option<String>,
    gateway_payment_id: Option<String>,
    hamper_note: Option<String>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = ShopError;
    fn try_from(r: OrderRow) -> Result<Self> {
        let money = |d: Decimal| Money::new(d).map_err(|e| corrupt("order", e));
        Ok(Order::restore(
            r.id,
            r.order_number,
            r.kind.parse().map_err(|e| corrupt("order", e))?,
            r.items.0,
            r.shipping_address.0,
            r.payment_method.parse().map_err(|e| corrupt("order", e))?,
            r.payment_status.parse().map_err(|e| corrupt("order", e))?,
            r.status.parse().map_err(|e| corrupt("order", e))?,
            money(r.subtotal)?,
            money(r.discount)?,
            money(r.total_amount)?,
            r.gateway_order_id,
            r.gateway_payment_id,
            r.hamper_note,
            r.created_at,
            r.updated_at,
            r.version,
        ))
    }
}

fn collect<R, T>(rows: Vec<R>) -> Result<Vec<T>>
where
    T: TryFrom<R, Error = ShopError>,
{
    rows.into_iter().map(T::try_from).collect()
}

const ORDER_COLUMNS: &str = "id, order_number, kind, items, shipping_address, payment_method, payment_status, status, subtotal, discount, total_amount, gateway_order_id, gateway_payment_id, hamper_note, version, created_at, updated_at";

#[async_trait]
impl Store for PgStore {
    fn backend_tag(&self) -> &'static str {
        "postgres"
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT * FROM products WHERE ($1::uuid IS NULL OR category_id = $1) AND (NOT $2 OR available) ORDER BY created_at DESC, id DESC",
        )
        .bind(filter.category_id)
        .bind(filter.available_only)
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        sqlx::query_as::<_, ProductRow>("SELECT * FROM products WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(Product::try_from)
            .transpose()
    }

    async fn insert_product(&self, p: &Product) -> Result<()> {
        sqlx::query(
            "INSERT INTO products (id, name, slug, description, price, discounted_price, images, category_id, available, colors, material, warranty, return_policy, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)",
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(p.slug.as_str())
        .bind(&p.description)
        .bind(p.price.amount())
        .bind(p.discounted_price.map(|m| m.amount()))
        .bind(&p.images)
        .bind(p.category_id)
        .bind(p.available)
        .bind(Json(&p.colors))
        .bind(&p.material)
        .bind(&p.warranty)
        .bind(&p.return_policy)
        .bind(p.created_at)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(&self, p: &Product) -> Result<()> {
        let done = sqlx::query(
            "UPDATE products SET name = $2, slug = $3, description = $4, price = $5, discounted_price = $6, images = $7, category_id = $8, \
             available = $9, colors = $10, material = $11, warranty = $12, return_policy = $13, updated_at = $14 WHERE id = $1",
        )
        .bind(p.id)
        .bind(&p.name)
        .bind(p.slug.as_str())
        .bind(&p.description)
        .bind(p.price.amount())
        .bind(p.discounted_price.map(|m| m.amount()))
        .bind(&p.images)
        .bind(p.category_id)
        .bind(p.available)
        .bind(Json(&p.colors))
        .bind(&p.material)
        .bind(&p.warranty)
        .bind(&p.return_policy)
        .bind(p.updated_at)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return Err(ShopError::NotFound("product"));
        }
        Ok(())
    }

    async fn delete_product(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        let rows = sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories ORDER BY name").fetch_all(&self.pool).await?;
        collect(rows)
    }

    async fn get_category(&self, id: Uuid) -> Result<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn get_category_by_slug(&self, slug: &str) -> Result<Option<Category>> {
        sqlx::query_as::<_, CategoryRow>("SELECT * FROM categories WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await?
            .map(Category::try_from)
            .transpose()
    }

    async fn insert_category(&self, c: &Category) -> Result<()> {
        sqlx::query("INSERT INTO categories (id, name, slug, image, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(c.id)
            .bind(&c.name)
            .bind(c.slug.as_str())
            .bind(&c.image)
            .bind(c.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn update_category(&self, c: &Category) -> Result<()> {
        let done = sqlx::query("UPDATE categories SET name = $2, slug = $3, image = $4 WHERE id = $1")
            .bind(c.id)
            .bind(&c.name)
            .bind(c.slug.as_str())
            .bind(&c.image)
            .execute(&self.pool)
            .await?;
        if done.rows_affected() == 0 {
            return Err(ShopError::NotFound("category"));
        }
        Ok(())
    }

    async fn delete_category(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM categories WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn category_product_counts(&self) -> Result<HashMap<Uuid, u64>> {
        let rows: Vec<(Uuid, i64)> =
            sqlx::query_as("SELECT category_id, COUNT(*) FROM products WHERE category_id IS NOT NULL GROUP BY category_id")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|(id, n)| (id, n.max(0) as u64)).collect())
    }

    async fn insert_review(&self, r: &Review) -> Result<()> {
        sqlx::query("INSERT INTO reviews (id, product_id, name, review, rating, created_at) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(r.id)
            .bind(r.product_id)
            .bind(&r.name)
            .bind(&r.review)
            .bind(i16::from(r.rating.value()))
            .bind(r.created_at)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn reviews_for_product(&self, product_id: Uuid) -> Result<Vec<Review>> {
        let rows = sqlx::query_as::<_, ReviewRow>("SELECT * FROM reviews WHERE product_id = $1 ORDER BY created_at DESC")
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;
        collect(rows)
    }

    async fn list_banners(&self) -> Result<Vec<Banner>> {
        let rows = sqlx::query_as::<_, BannerRow>("SELECT * FROM banners ORDER BY position").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(Banner::from).collect())
    }

    async fn insert_banner(&self, b: &Banner) -> Result<()> {
        sqlx::query("INSERT INTO banners (id, title, image, link, position, active) VALUES ($1, $2, $3, $4, $5, $6)")
            .bind(b.id)
            .bind(&b.title)
            .bind(&b.image)
            .bind(&b.link)
            .bind(b.position)
            .bind(b.active)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn delete_banner(&self, id: Uuid) -> Result<bool> {
        let done = sqlx::query("DELETE FROM banners WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(done.rows_affected() > 0)
    }

    async fn insert_order(&self, o: &Order) -> Result<()> {
        sqlx::query(
            "INSERT INTO orders (id, order_number, kind, items, shipping_address, phone, payment_method, payment_status, status, subtotal, discount, total_amount, \
             gateway_order_id, gateway_payment_id, hamper_note, version, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)",
        )
        .bind(o.id)
        .bind(&o.order_number)
        .bind(o.kind.as_str())
        .bind(Json(&o.items))
        .bind(Json(&o.shipping_address))
        .bind(o.phone().as_str())
        .bind(o.payment_method.as_str())
        .bind(o.payment_status().as_str())
        .bind(o.status().as_str())
        .bind(o.subtotal.amount())
        .bind(o.discount.amount())
        .bind(o.total_amount.amount())
        .bind(&o.gateway_order_id)
        .bind(&o.gateway_payment_id)
        .bind(&o.hamper_note)
        .bind(o.version)
        .bind(o.created_at)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_order(&self, o: &mut Order) -> Result<()> {
        let done = sqlx::query(
            "UPDATE orders SET payment_status = $3, status = $4, gateway_order_id = $5, gateway_payment_id = $6, updated_at = $7, version = version + 1 \
             WHERE id = $1 AND version = $2",
        )
        .bind(o.id)
        .bind(o.version)
        .bind(o.payment_status().as_str())
        .bind(o.status().as_str())
        .bind(&o.gateway_order_id)
        .bind(&o.gateway_payment_id)
        .bind(o.updated_at)
        .execute(&self.pool)
        .await?;
        if done.rows_affected() == 0 {
            return match self.get_order(o.id).await? {
                Some(_) => Err(ShopError::Conflict(format!("order {} was modified concurrently", o.order_number))),
                None => Err(ShopError::NotFound("order")),
            };
        }
        o.version += 1;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn find_order_by_gateway_id(&self, gateway_order_id: &str) -> Result<Option<Order>> {
        sqlx::query_as::<_, OrderRow>(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE gateway_order_id = $1"))
            .bind(gateway_order_id)
            .fetch_optional(&self.pool)
            .await?
            .map(Order::try_from)
            .transpose()
    }

    async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE ($1::text IS NULL OR status = $1) AND ($2::text IS NULL OR phone = $2) ORDER BY created_at DESC, id DESC"
        ))
        .bind(filter.status.map(|s| s.as_str()))
        .bind(filter.phone.as_ref().map(|p| p.as_str().to_string()))
        .fetch_all(&self.pool)
        .await?;
        collect(rows)
    }
}
