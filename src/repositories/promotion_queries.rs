//! Bespoke promotion queries.
//!
//! Thin callers of the generic surface; anything expressible through
//! `PromotionFilter` stays out of here.

use std::sync::Arc;

use jiff::Timestamp;

use crate::error::StoreResult;
use crate::models::Promotion;
use crate::repositories::Repository;

impl Repository<Promotion> {
    /// Point lookup by exact code, case-insensitive.
    pub async fn find_by_code(&self, code: &str) -> StoreResult<Option<Promotion>> {
        let wanted = code.to_lowercase();
        self.find_first(Arc::new(move |p: &Promotion| {
            p.code.to_lowercase() == wanted
        }))
        .await
    }

    /// Active promotions whose redemption window covers `now`.
    pub async fn active_in_window(&self, now: Timestamp) -> StoreResult<Vec<Promotion>> {
        self.find_all(Some(Arc::new(move |p: &Promotion| p.in_window(now))))
            .await
    }
}
