//! Blog post aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// A marketing blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    pub id: EntityId,
    pub title: String,
    pub slug: String,
    pub body: String,
    pub is_published: bool,
    pub published_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl BlogPost {
    pub fn new(
        title: impl Into<String>,
        slug: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: EntityId::new(),
            title: title.into(),
            slug: slug.into(),
            body: body.into(),
            is_published: false,
            published_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Publishes the post at `at`.
    pub fn publish(&mut self, at: Timestamp) {
        self.is_published = true;
        self.published_at = Some(at);
    }
}

impl Entity for BlogPost {
    const COLLECTION: &'static str = "blog_posts";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over blog posts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BlogPostFilter {
    /// Case-insensitive substring over the title
    pub title: Option<String>,
    pub is_published: Option<bool>,
    /// Inclusive: posts published on or after this instant. Unpublished
    /// posts never match when this bound is present.
    pub published_on_or_after: Option<Timestamp>,
}

impl BlogPostFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<BlogPost>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("title", |p: &BlogPost| p.title.clone()),
                self.title.clone().map(Criterion::Contains),
            )?
            .field(
                Field::flag("is_published", |p: &BlogPost| p.is_published),
                self.is_published
                    .map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .field(
                // Unpublished posts sort below every real instant
                Field::timestamp("published_at", |p: &BlogPost| {
                    p.published_at.unwrap_or(Timestamp::MIN)
                }),
                self.published_on_or_after
                    .map(|t| Criterion::AtLeast(FieldValue::Timestamp(t))),
            )?
            .build())
    }
}
