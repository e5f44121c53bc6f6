//! Home-page slider aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// One slide in the home-page carousel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slider {
    pub id: EntityId,
    pub title: String,
    pub image_url: String,
    pub caption: Option<String>,
    pub position: i64,
    pub is_active: bool,
    pub created_at: Timestamp,
}

impl Slider {
    pub fn new(title: impl Into<String>, image_url: impl Into<String>, position: i64) -> Self {
        Self {
            id: EntityId::new(),
            title: title.into(),
            image_url: image_url.into(),
            caption: None,
            position,
            is_active: true,
            created_at: Timestamp::now(),
        }
    }
}

impl Entity for Slider {
    const COLLECTION: &'static str = "sliders";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over sliders.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SliderFilter {
    pub title: Option<String>,
    pub is_active: Option<bool>,
}

impl SliderFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<Slider>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("title", |s: &Slider| s.title.clone()),
                self.title.clone().map(Criterion::Contains),
            )?
            .field(
                Field::flag("is_active", |s: &Slider| s.is_active),
                self.is_active.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .build())
    }
}
