//! Product Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Money, Slug, ValueError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub description: String,
    pub price: Money,
    pub discounted_price: Option<Money>,
    pub images: Vec<String>,
    pub category_id: Option<Uuid>,
    pub available: bool,
    pub colors: Vec<ColorVariant>,
    pub material: Option<String>,
    pub warranty: Option<String>,
    pub return_policy: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A colour option; `image_indexes` point into the product's `images`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColorVariant { pub name: String, pub code: String, #[serde(default)] pub image_indexes: Vec<usize> }

#[derive(Clone, Debug, Deserialize)]
pub struct ProductDraft {
    pub name: String,
    #[serde(default)] pub description: String,
    pub price: Money,
    #[serde(default)] pub discounted_price: Option<Money>,
    #[serde(default)] pub images: Vec<String>,
    #[serde(default)] pub category_id: Option<Uuid>,
    #[serde(default = "default_available")] pub available: bool,
    #[serde(default)] pub colors: Vec<ColorVariant>,
    #[serde(default)] pub material: Option<String>,
    #[serde(default)] pub warranty: Option<String>,
    #[serde(default)] pub return_policy: Option<String>,
}

fn default_available() -> bool { true }

/// Partial update; absent fields are left alone.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    /// `Some(None)` clears the discount.
    #[serde(default, deserialize_with = "double_option")]
    pub discounted_price: Option<Option<Money>>,
    pub images: Option<Vec<String>>,
    pub category_id: Option<Uuid>,
    pub available: Option<bool>,
    pub colors: Option<Vec<ColorVariant>>,
    pub material: Option<String>,
    pub warranty: Option<String>,
    pub return_policy: Option<String>,
}

fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

impl Product {
    pub fn create(draft: ProductDraft) -> Result<Self, ProductError> {
        let now = Utc::now();
        let product = Self {
            id: Uuid::now_v7(),
            slug: Slug::from_name(&draft.name)?,
            name: draft.name.trim().to_string(),
            description: draft.description,
            price: draft.price,
            discounted_price: draft.discounted_price,
            images: draft.images,
            category_id: draft.category_id,
            available: draft.available,
            colors: draft.colors,
            material: draft.material,
            warranty: draft.warranty,
            return_policy: draft.return_policy,
            created_at: now,
            updated_at: now,
        };
        product.validate()?;
        Ok(product)
    }

    pub fn apply(&mut self, update: ProductUpdate) -> Result<(), ProductError> {
        let mut next = self.clone();
        if let Some(name) = update.name {
            next.slug = Slug::from_name(&name)?;
            next.name = name.trim().to_string();
        }
        if let Some(d) = update.description { next.description = d; }
        if let Some(p) = update.price { next.price = p; }
        if let Some(dp) = update.discounted_price { next.discounted_price = dp; }
        if let Some(i) = update.images { next.images = i; }
        if let Some(c) = update.category_id { next.category_id = Some(c); }
        if let Some(a) = update.available { next.available = a; }
        if let Some(c) = update.colors { next.colors = c; }
        if let Some(m) = update.material { next.material = Some(m); }
        if let Some(w) = update.warranty { next.warranty = Some(w); }
        if let Some(r) = update.return_policy { next.return_policy = Some(r); }
        next.validate()?;
        next.touch();
        *self = next;
        Ok(())
    }

    /// What a buyer pays per unit.
    pub fn unit_price(&self) -> Money { self.discounted_price.unwrap_or(self.price) }

    pub fn set_availability(&mut self, available: bool) { self.available = available; self.touch(); }

    pub fn primary_image(&self) -> Option<&str> { self.images.first().map(String::as_str) }

    pub fn has_color(&self, name: &str) -> bool { self.colors.iter().any(|c| c.name.eq_ignore_ascii_case(name)) }

    fn validate(&self) -> Result<(), ProductError> {
        if self.name.is_empty() { return Err(ProductError::MissingName); }
        if self.price.is_zero() { return Err(ProductError::ZeroPrice); }
        if let Some(dp) = self.discounted_price {
            if dp > self.price { return Err(ProductError::DiscountAbovePrice); }
        }
        for color in &self.colors {
            if !is_hex_color(&color.code) { return Err(ProductError::InvalidColorCode(color.code.clone())); }
            if let Some(&bad) = color.image_indexes.iter().find(|&&i| i >= self.images.len()) {
                return Err(ProductError::ImageIndexOutOfRange(bad));
            }
        }
        Ok(())
    }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

fn is_hex_color(code: &str) -> bool {
    code.strip_prefix('#')
        .map(|h| matches!(h.len(), 3 | 6) && h.bytes().all(|b| b.is_ascii_hexdigit()))
        .unwrap_or(false)
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProductError { MissingName, ZeroPrice, DiscountAbovePrice, InvalidColorCode(String), ImageIndexOutOfRange(usize), Value(ValueError) }
impl std::error::Error for ProductError {}
impl std::fmt::Display for ProductError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingName => write!(f, "product name is required"),
            Self::ZeroPrice => write!(f, "price must be greater than zero"),
            Self::DiscountAbovePrice => write!(f, "discounted price cannot exceed price"),
            Self::InvalidColorCode(c) => write!(f, "invalid colour code: {c}"),
            Self::ImageIndexOutOfRange(i) => write!(f, "colour references missing image #{i}"),
            Self::Value(e) => write!(f, "{e}"),
        }
    }
}
impl From<ValueError> for ProductError {
    fn from(e: ValueError) -> Self { Self::Value(e) }
}
