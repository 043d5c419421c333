//! HTTP surface consumed by the storefront SPA and admin panel.

pub mod admin;
pub mod catalog;
pub mod extract;
pub mod orders;
pub mod otp;
pub mod payments;
pub mod reviews;

use axum::{
    http::{HeaderValue, Method},
    routing::{delete, get, patch, post, put},
    Json, Router,
};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors_origins);
    let backend = state.store.backend_tag();

    Router::new()
        .route("/health", get(move || async move { Json(serde_json::json!({"status": "healthy", "service": "mahakal-store", "store": backend})) }))
        // catalog
        .route("/api/getproducts", get(catalog::list_products))
        .route("/api/getproductbyid/:id", get(catalog::get_product))
        .route("/api/products/slug/:slug", get(catalog::get_product_by_slug))
        .route("/api/getAllData", get(catalog::all_data))
        .route("/api/categories", get(catalog::list_categories))
        .route("/api/categories/:slug/products", get(catalog::category_products))
        .route("/api/search", get(catalog::search))
        .route("/api/getbanners", get(catalog::list_banners))
        // reviews
        .route("/review/add", post(reviews::add_review))
        .route("/review/get/:product_id", get(reviews::product_reviews))
        // phone verification
        .route("/otp/send", post(otp::send_otp))
        .route("/otp/verify", post(otp::verify_otp))
        // orders
        .route("/orders/quote", post(orders::quote))
        .route("/orders/create", post(orders::create_order))
        .route("/orders/my", get(orders::my_orders))
        .route("/orders/:id", get(orders::get_order))
        .route("/orders/:id/cancel", post(orders::cancel_order))
        .route("/orders/admin/all", get(orders::admin_list_orders))
        .route("/orders/admin/:id/status", patch(orders::admin_update_status))
        // payments
        .route("/razorpay/create-order", post(payments::create_payment))
        .route("/razorpay/verify", post(payments::verify_payment))
        .route("/razorpay/payment-failed", post(payments::payment_failed))
        .route("/razorpay/webhook", post(payments::webhook))
        // admin catalog
        .route("/admin/products", post(admin::create_product))
        .route("/admin/products/:id", put(admin::update_product).delete(admin::delete_product))
        .route("/admin/categories", post(admin::create_category))
        .route("/admin/categories/:id", put(admin::update_category).delete(admin::delete_category))
        .route("/admin/banners", post(admin::create_banner))
        .route("/admin/banners/:id", delete(admin::delete_banner))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE])
        .allow_headers(Any)
}
