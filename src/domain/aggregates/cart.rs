//! Cart Aggregate
//!
//! The basket a shopper submits at checkout. Prices always come from the
//! catalog, never from the client.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::order::PaymentMethod;
use crate::domain::aggregates::product::Product;
use crate::domain::value_objects::Money;

/// One requested line as sent by the client.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BasketLine {
    pub product_id: Uuid,
    pub quantity: u32,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub product_id: Uuid,
    pub name: String,
    pub image: Option<String>,
    pub color: Option<String>,
    pub quantity: u32,
    pub unit_price: Money,
}

impl CartItem {
    pub fn line_total(&self) -> Money { self.unit_price.multiply(self.quantity) }
}

#[derive(Clone, Debug, Default)]
pub struct Cart {
    items: Vec<CartItem>,
}

/// Priced basket for one payment method.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Quote {
    pub payment_method: PaymentMethod,
    pub items: Vec<CartItem>,
    pub subtotal: Money,
    pub discount_percent: u8,
    pub discount: Money,
    pub total: Money,
}

impl Cart {
    pub fn new() -> Self { Self::default() }

    pub fn items(&self) -> &[CartItem] { &self.items }

    /// Adds `quantity` of `product`, merging with an existing line of the same colour.
    pub fn add_product(&mut self, product: &Product, quantity: u32, color: Option<&str>) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity(product.id)); }
        if !product.available { return Err(CartError::Unavailable(product.name.clone())); }
        let color = match color.map(str::trim).filter(|c| !c.is_empty()) {
            Some(c) if !product.has_color(c) => return Err(CartError::UnknownColor { product: product.name.clone(), color: c.to_string() }),
            Some(c) => Some(c.to_string()),
            None => None,
        };
        if let Some(existing) = self.items.iter_mut().find(|i| i.product_id == product.id && eq_color(&i.color, &color)) {
            existing.quantity = existing.quantity.saturating_add(quantity);
        } else {
            self.items.push(CartItem {
                product_id: product.id,
                name: product.name.clone(),
                image: product.primary_image().map(str::to_string),
                color,
                quantity,
                unit_price: product.unit_price(),
            });
        }
        Ok(())
    }

    pub fn subtotal(&self) -> Money {
        self.items.iter().fold(Money::ZERO, |acc, i| acc.add(i.line_total()))
    }

    /// Online payments earn `online_discount_percent` off the subtotal; COD pays full price.
    pub fn quote(&self, method: PaymentMethod, online_discount_percent: u8) -> Quote {
        let subtotal = self.subtotal();
        let discount_percent = match method { PaymentMethod::Online => online_discount_percent, PaymentMethod::Cod => 0 };
        let discount = subtotal.percent_off(discount_percent);
        Quote { payment_method: method, items: self.items.clone(), subtotal, discount_percent, discount, total: subtotal.subtract(discount) }
    }
}

fn eq_color(a: &Option<String>, b: &Option<String>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.eq_ignore_ascii_case(b),
        (None, None) => true,
        _ => false,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartError { Empty, InvalidQuantity(Uuid), Unavailable(String), UnknownColor { product: String, color: String } }
impl std::error::Error for CartError {}
impl std::fmt::Display for CartError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "cart is empty"),
            Self::InvalidQuantity(id) => write!(f, "quantity for product {id} must be at least 1"),
            Self::Unavailable(name) => write!(f, "{name} is currently unavailable"),
            Self::UnknownColor { product, color } => write!(f, "{product} does not come in {color}"),
        }
    }
}
