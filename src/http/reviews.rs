use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::domain::aggregates::{Review, ReviewDraft, ReviewSummary};
use crate::http::extract::ApiJson;
use crate::error::{Result, ShopError};
use crate::state::AppState;

pub async fn add_review(State(s): State<AppState>, ApiJson(draft): ApiJson<ReviewDraft>) -> Result<(StatusCode, Json<Review>)> {
    draft.validate()?;
    if s.store.get_product(draft.product_id).await?.is_none() {
        return Err(ShopError::NotFound("product"));
    }
    let review = Review::create(draft);
    s.store.insert_review(&review).await?;
    tracing::info!(product = %review.product_id, rating = review.rating.value(), "review added");
    Ok((StatusCode::CREATED, Json(review)))
}

pub async fn product_reviews(State(s): State<AppState>, Path(product_id): Path<Uuid>) -> Result<Json<ReviewSummary>> {
    if s.store.get_product(product_id).await?.is_none() {
        return Err(ShopError::NotFound("product"));
    }
    let reviews = s.store.reviews_for_product(product_id).await?;
    Ok(Json(ReviewSummary::from_reviews(reviews)))
}
