//! Bespoke category queries.

use std::sync::Arc;

use crate::error::StoreResult;
use crate::models::Category;
use crate::repositories::Repository;

impl Repository<Category> {
    /// Active categories in name order, for navigation menus.
    pub async fn active_ordered(&self) -> StoreResult<Vec<Category>> {
        let mut categories = self
            .find_all(Some(Arc::new(|c: &Category| c.is_active)))
            .await?;
        categories.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(categories)
    }

    /// Point lookup by URL slug.
    pub async fn find_by_slug(&self, slug: &str) -> StoreResult<Option<Category>> {
        let wanted = slug.to_string();
        self.find_first(Arc::new(move |c: &Category| c.slug == wanted))
            .await
    }
}
