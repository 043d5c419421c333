//! Category Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::{Slug, ValueError};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub slug: Slug,
    pub image: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A category as listed, with its derived product count.
#[derive(Clone, Debug, Serialize)]
pub struct CategorySummary {
    #[serde(flatten)]
    pub category: Category,
    pub product_count: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct CategoryDraft { pub name: String, #[serde(default)] pub image: Option<String> }

impl Category {
    pub fn create(draft: CategoryDraft) -> Result<Self, ValueError> {
        Ok(Self {
            id: Uuid::now_v7(),
            slug: Slug::from_name(&draft.name)?,
            name: draft.name.trim().to_string(),
            image: draft.image,
            created_at: Utc::now(),
        })
    }

    pub fn rename(&mut self, draft: CategoryDraft) -> Result<(), ValueError> {
        self.slug = Slug::from_name(&draft.name)?;
        self.name = draft.name.trim().to_string();
        if draft.image.is_some() { self.image = draft.image; }
        Ok(())
    }

    pub fn with_count(self, product_count: u64) -> CategorySummary { CategorySummary { category: self, product_count } }
}
