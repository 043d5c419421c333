//! Divine Mahakal storefront API
//!
//! Backend for a spiritual goods shop: catalog, reviews, phone-verified
//! checkout with Razorpay or cash on delivery, and order tracking.
//!
//! ## Features
//! - Product, category and banner catalog with admin management
//! - Fuzzy catalog search
//! - OTP phone verification gating checkout
//! - Cart, direct-buy and hamper orders with a 15% online payment discount
//! - Razorpay order creation, signature checks and webhooks
//! - Order status rules for customers and admins

pub mod checkout;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod otp;
pub mod payments;
pub mod state;
pub mod store;
pub mod telemetry;

pub use config::Config;
pub use error::{Result, ShopError};
pub use http::build_router;
pub use state::{AppState, EventPublisher};
