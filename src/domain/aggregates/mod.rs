//! Aggregates module
pub mod product;
pub mod category;
pub mod review;
pub mod banner;
pub mod order;
pub mod cart;

pub use product::{ColorVariant, Product, ProductDraft, ProductError, ProductUpdate};
pub use category::{Category, CategoryDraft, CategorySummary};
pub use review::{Review, ReviewDraft, ReviewSummary};
pub use banner::{Banner, BannerDraft};
pub use order::{LineItem, Order, OrderError, OrderKind, OrderStatus, PaymentMethod, PaymentStatus, ShippingAddress};
pub use cart::{BasketLine, Cart, CartError, CartItem, Quote};
