//! Review Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::{not_blank, Rating};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub review: String,
    pub rating: Rating,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct ReviewDraft {
    pub product_id: Uuid,
    #[validate(length(min = 1, max = 80, message = "name is required"), custom = "not_blank")]
    pub name: String,
    #[validate(length(min = 1, max = 2000, message = "review text is required"), custom = "not_blank")]
    pub review: String,
    pub rating: Rating,
}

impl Review {
    /// Callers must have checked that the product exists.
    pub fn create(draft: ReviewDraft) -> Self {
        Self {
            id: Uuid::now_v7(),
            product_id: draft.product_id,
            name: draft.name.trim().to_string(),
            review: draft.review.trim().to_string(),
            rating: draft.rating,
            created_at: Utc::now(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ReviewSummary {
    pub count: usize,
    pub average_rating: Decimal,
    pub reviews: Vec<Review>,
}

impl ReviewSummary {
    /// Sorts newest first; the average is rounded to one decimal.
    pub fn from_reviews(mut reviews: Vec<Review>) -> Self {
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        let count = reviews.len();
        let average_rating = if count == 0 {
            Decimal::ZERO
        } else {
            let total: u32 = reviews.iter().map(|r| u32::from(r.rating.value())).sum();
            (Decimal::from(total) / Decimal::from(count as u64)).round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        };
        Self { count, average_rating, reviews }
    }
}
