//! Promotion aggregate.
//!
//! Promotions are the original home of the runtime filter mechanism: the
//! back-office search screen sends any subset of code / active / date
//! bounds and the filter must honor exactly the present ones.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// A discount promotion with a redemption window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Promotion {
    pub id: EntityId,
    pub code: String,
    pub description: Option<String>,
    pub discount_percent: u8,
    pub is_active: bool,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
}

impl Promotion {
    pub fn new(
        code: impl Into<String>,
        discount_percent: u8,
        starts_at: Timestamp,
        ends_at: Timestamp,
    ) -> Self {
        Self {
            id: EntityId::new(),
            code: code.into(),
            description: None,
            discount_percent,
            is_active: true,
            starts_at,
            ends_at,
        }
    }

    /// Whether the promotion is redeemable at `now`.
    pub fn in_window(&self, now: Timestamp) -> bool {
        self.is_active && self.starts_at <= now && now <= self.ends_at
    }
}

impl Entity for Promotion {
    const COLLECTION: &'static str = "promotions";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over promotions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PromotionFilter {
    /// Case-insensitive substring over the code
    pub code: Option<String>,
    pub is_active: Option<bool>,
    /// Inclusive: promotions starting on or after this instant
    pub starts_on_or_after: Option<Timestamp>,
    /// Inclusive: promotions ending on or before this instant
    pub ends_on_or_before: Option<Timestamp>,
}

impl PromotionFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<Promotion>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("code", |p: &Promotion| p.code.clone()),
                self.code.clone().map(Criterion::Contains),
            )?
            .field(
                Field::flag("is_active", |p: &Promotion| p.is_active),
                self.is_active.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .field(
                Field::timestamp("starts_at", |p: &Promotion| p.starts_at),
                self.starts_on_or_after
                    .map(|t| Criterion::AtLeast(FieldValue::Timestamp(t))),
            )?
            .field(
                Field::timestamp("ends_at", |p: &Promotion| p.ends_at),
                self.ends_on_or_before
                    .map(|t| Criterion::AtMost(FieldValue::Timestamp(t))),
            )?
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(code: &str, active: bool, starts: &str, ends: &str) -> Promotion {
        let mut p = Promotion::new(
            code,
            10,
            starts.parse().unwrap(),
            ends.parse().unwrap(),
        );
        p.is_active = active;
        p
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let predicate = PromotionFilter::default().predicate().unwrap();
        assert!(predicate(&promo(
            "SAVE10",
            false,
            "2024-01-01T00:00:00Z",
            "2024-02-01T00:00:00Z"
        )));
    }

    #[test]
    fn test_combined_criteria() {
        let filter = PromotionFilter {
            code: Some("save".to_string()),
            is_active: Some(true),
            starts_on_or_after: Some("2024-01-01T00:00:00Z".parse().unwrap()),
            ends_on_or_before: Some("2024-12-31T00:00:00Z".parse().unwrap()),
        };
        let predicate = filter.predicate().unwrap();

        assert!(predicate(&promo(
            "SAVE10",
            true,
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z"
        )));
        // Starts before the lower bound
        assert!(!predicate(&promo(
            "SAVE10",
            true,
            "2023-12-01T00:00:00Z",
            "2024-04-01T00:00:00Z"
        )));
        // Wrong code
        assert!(!predicate(&promo(
            "WELCOME",
            true,
            "2024-03-01T00:00:00Z",
            "2024-04-01T00:00:00Z"
        )));
    }

    #[test]
    fn test_in_window() {
        let p = promo(
            "SAVE10",
            true,
            "2024-01-01T00:00:00Z",
            "2024-02-01T00:00:00Z",
        );
        assert!(p.in_window("2024-01-15T00:00:00Z".parse().unwrap()));
        assert!(!p.in_window("2024-03-01T00:00:00Z".parse().unwrap()));
    }
}
