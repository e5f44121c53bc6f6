//! Storefront banner aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// A promotional banner shown on the storefront.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Banner {
    pub id: EntityId,
    pub title: String,
    pub image_url: String,
    pub link_url: Option<String>,
    /// Display order, ascending
    pub position: i64,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Banner {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>, position: i64) -> Self {
        Self {
            id: EntityId::new(),
            title: title.into(),
            image_url: image_url.into(),
            link_url: None,
            position,
            is_active: true,
            created_at: Timestamp::now(),
        }
    }
}

impl Entity for Banner {
    const COLLECTION: &'static str = "banners";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over banners.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BannerFilter {
    pub title: Option<String>,
    pub is_active: Option<bool>,
}

impl BannerFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<Banner>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("title", |b: &Banner| b.title.clone()),
                self.title.clone().map(Criterion::Contains),
            )?
            .field(
                Field::flag("is_active", |b: &Banner| b.is_active),
                self.is_active.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .build())
    }
}
