//! Banner Aggregate

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;
use crate::domain::value_objects::not_blank;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Banner {
    pub id: Uuid,
    pub title: String,
    pub image: String,
    pub link: Option<String>,
    pub position: i32,
    pub active: bool,
}

#[derive(Clone, Debug, Deserialize, Validate)]
pub struct BannerDraft {
    #[validate(length(min = 1, max = 120), custom = "not_blank")]
    pub title: String,
    #[validate(length(min = 1), custom = "not_blank")]
    pub image: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub position: i32,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool { true }

impl Banner {
    pub fn create(draft: BannerDraft) -> Self {
        Self { id: Uuid::now_v7(), title: draft.title, image: draft.image, link: draft.link, position: draft.position, active: draft.active }
    }
}

/// Active banners in display order.
pub fn visible(mut banners: Vec<Banner>) -> Vec<Banner> {
    banners.retain(|b| b.active);
    banners.sort_by_key(|b| b.position);
    banners
}
