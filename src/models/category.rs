//! Game-account category aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// A storefront category grouping game accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: EntityId,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Category {
    /// Creates a category with a fresh identity.
    pub fn new(name: impl Into<String>, slug: impl Into<String>) -> Self {
        let now = Timestamp::now();
        Self {
            id: EntityId::new(),
            name: name.into(),
            slug: slug.into(),
            description: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Category {
    const COLLECTION: &'static str = "categories";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over categories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryFilter {
    /// Case-insensitive substring over the name
    pub name: Option<String>,
    pub is_active: Option<bool>,
}

impl CategoryFilter {
    /// Translates the present criteria into one conjunctive predicate.
    pub fn predicate(&self) -> StoreResult<Predicate<Category>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("name", |c: &Category| c.name.clone()),
                self.name.clone().map(Criterion::Contains),
            )?
            .field(
                Field::flag("is_active", |c: &Category| c.is_active),
                self.is_active.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .build())
    }
}
