//! Bespoke game-account queries.

use std::sync::Arc;

use jiff::Timestamp;

use crate::error::StoreResult;
use crate::models::GameAccount;
use crate::repositories::Repository;

impl Repository<GameAccount> {
    /// Point lookup by the unique in-game account name.
    pub async fn find_by_account_name(&self, name: &str) -> StoreResult<Option<GameAccount>> {
        let wanted = name.to_string();
        self.find_first(Arc::new(move |a: &GameAccount| a.account_name == wanted))
            .await
    }

    /// Total revenue in cents from listings sold within `[from, to]`,
    /// bounds inclusive.
    pub async fn revenue_between(&self, from: Timestamp, to: Timestamp) -> StoreResult<i64> {
        let sold = self
            .find_all(Some(Arc::new(move |a: &GameAccount| {
                a.is_sold
                    && a.sold_at
                        .is_some_and(|at| from <= at && at <= to)
            })))
            .await?;
        Ok(sold.iter().map(|a| a.price_cents).sum())
    }
}
