//! Game account listing aggregate.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use crate::criteria::{Criterion, Field, FieldValue, Predicate, PredicateBuilder};
use crate::entity::{Entity, EntityId};
use crate::error::StoreResult;

/// A game account offered for sale.
///
/// Prices are integer cents; sold listings stay in the store for revenue
/// reporting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameAccount {
    pub id: EntityId,
    pub category_id: EntityId,
    pub title: String,
    /// In-game account name, unique per listing
    pub account_name: String,
    pub price_cents: i64,
    pub is_sold: bool,
    pub sold_at: Option<Timestamp>,
    pub created_at: Timestamp,
}

impl GameAccount {
    pub fn new(
        category_id: EntityId,
        title: impl Into<String>,
        account_name: impl Into<String>,
        price_cents: i64,
    ) -> Self {
        Self {
            id: EntityId::new(),
            category_id,
            title: title.into(),
            account_name: account_name.into(),
            price_cents,
            is_sold: false,
            sold_at: None,
            created_at: Timestamp::now(),
        }
    }

    /// Marks the listing sold at `at`.
    pub fn mark_sold(&mut self, at: Timestamp) {
        self.is_sold = true;
        self.sold_at = Some(at);
    }
}

impl Entity for GameAccount {
    const COLLECTION: &'static str = "game_accounts";

    fn id(&self) -> EntityId {
        self.id
    }
}

/// Sparse search criteria over game accounts.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameAccountFilter {
    /// Case-insensitive substring over the listing title
    pub title: Option<String>,
    pub category_id: Option<EntityId>,
    pub is_sold: Option<bool>,
    /// Inclusive price bounds, in cents
    pub min_price_cents: Option<i64>,
    pub max_price_cents: Option<i64>,
}

impl GameAccountFilter {
    pub fn predicate(&self) -> StoreResult<Predicate<GameAccount>> {
        Ok(PredicateBuilder::new()
            .field(
                Field::text("title", |a: &GameAccount| a.title.clone()),
                self.title.clone().map(Criterion::Contains),
            )?
            .field(
                Field::text("category_id", |a: &GameAccount| a.category_id.to_string()),
                self.category_id
                    .map(|id| Criterion::Equals(FieldValue::Text(id.to_string()))),
            )?
            .field(
                Field::flag("is_sold", |a: &GameAccount| a.is_sold),
                self.is_sold.map(|v| Criterion::Equals(FieldValue::Flag(v))),
            )?
            .field(
                Field::integer("price_cents", |a: &GameAccount| a.price_cents),
                self.min_price_cents
                    .map(|v| Criterion::AtLeast(FieldValue::Integer(v))),
            )?
            .field(
                Field::integer("price_cents", |a: &GameAccount| a.price_cents),
                self.max_price_cents
                    .map(|v| Criterion::AtMost(FieldValue::Integer(v))),
            )?
            .build())
    }
}
