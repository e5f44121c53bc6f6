//! Unit of work: one transactional session coordinating every
//! repository.
//!
//! One instance is scoped to exactly one request lifetime and
//! exclusively owns its engine session. Repositories stage writes into a
//! shared pending set; `save_changes` flushes them as one atomic batch.
//! Call sites either wrap multi-step writes in an explicit
//! `begin`/`commit` pair or call `save_changes` bare, which applies as
//! an implicit single-batch transaction.

mod changes;

pub(crate) use changes::{ChangeSet, PendingOp};

use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::engine::{EngineSession, StorageEngine};
use crate::entity::Entity;
use crate::error::{StoreError, StoreResult};
use crate::models::{Banner, BlogPost, Category, GameAccount, Promotion, Slider, User};
use crate::repositories::Repository;

/// Shared state behind one unit of work and its repositories.
pub(crate) struct SessionInner {
    pub(crate) session: Box<dyn EngineSession>,
    pub(crate) pending: Mutex<ChangeSet>,
    pub(crate) config: StoreConfig,
}

/// The transactional session.
pub struct UnitOfWork {
    inner: Arc<SessionInner>,
    tx_active: Mutex<bool>,
    cancel: Option<CancellationToken>,
}

impl UnitOfWork {
    /// Opens a unit of work with default configuration.
    pub async fn open(engine: &dyn StorageEngine) -> StoreResult<Self> {
        Self::with_config(engine, StoreConfig::default()).await
    }

    /// Opens a unit of work with the given configuration.
    pub async fn with_config(engine: &dyn StorageEngine, config: StoreConfig) -> StoreResult<Self> {
        config.validate()?;
        let session = engine.open_session().await?;
        Ok(Self {
            inner: Arc::new(SessionInner {
                session,
                pending: Mutex::new(ChangeSet::default()),
                config,
            }),
            tx_active: Mutex::new(false),
            cancel: None,
        })
    }

    /// Ties in-flight flushes to a cancellation token; cancellation
    /// aborts the flush and rolls back any active transaction.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    // ========================================================================
    // Repositories
    // ========================================================================

    /// Repository for an arbitrary entity type under this session.
    pub fn repository<T: Entity>(&self) -> Repository<T> {
        Repository::new(Arc::clone(&self.inner))
    }

    pub fn categories(&self) -> Repository<Category> {
        self.repository()
    }

    pub fn game_accounts(&self) -> Repository<GameAccount> {
        self.repository()
    }

    pub fn promotions(&self) -> Repository<Promotion> {
        self.repository()
    }

    pub fn banners(&self) -> Repository<Banner> {
        self.repository()
    }

    pub fn sliders(&self) -> Repository<Slider> {
        self.repository()
    }

    pub fn blog_posts(&self) -> Repository<BlogPost> {
        self.repository()
    }

    pub fn users(&self) -> Repository<User> {
        self.repository()
    }

    // ========================================================================
    // Transaction control
    // ========================================================================

    /// Opens an explicit transaction. Erroring when one is already
    /// active.
    pub async fn begin(&self) -> StoreResult<()> {
        let mut active = self.tx_active.lock().await;
        if *active {
            return Err(StoreError::invalid_state(
                "a transaction is already active on this unit of work",
            ));
        }
        self.inner.session.begin().await?;
        *active = true;
        debug!("transaction begun");
        Ok(())
    }

    /// Flushes anything still staged, then commits the transaction.
    /// Erroring when no transaction is active. A flush failure rolls the
    /// whole transaction back before the error is re-raised.
    pub async fn commit(&self) -> StoreResult<()> {
        let mut active = self.tx_active.lock().await;
        if !*active {
            return Err(StoreError::invalid_state(
                "commit called without an active transaction",
            ));
        }
        if let Err(err) = self.flush("commit").await {
            *active = false;
            if let Err(rollback_err) = self.inner.session.rollback().await {
                warn!(error = %rollback_err, "rollback after failed flush also failed");
            }
            warn!(error = %err, "flush failed; transaction rolled back");
            return Err(err);
        }
        *active = false;
        self.inner.session.commit().await?;
        debug!("transaction committed");
        Ok(())
    }

    /// Discards staged changes and rolls back the active transaction.
    /// A no-op when no transaction is active, so rollback-on-error paths
    /// are safe around bare `save_changes` call sites.
    pub async fn rollback(&self) -> StoreResult<()> {
        let mut active = self.tx_active.lock().await;
        self.inner.pending.lock().await.clear();
        if !*active {
            return Ok(());
        }
        *active = false;
        self.inner.session.rollback().await?;
        debug!("transaction rolled back");
        Ok(())
    }

    /// Whether an explicit transaction is currently active.
    pub async fn in_transaction(&self) -> bool {
        *self.tx_active.lock().await
    }

    /// Flushes all staged adds/updates/deletes across every repository
    /// as one atomic batch; inside an explicit transaction the batch
    /// lands in the transaction's scope, otherwise it applies as an
    /// implicit single-batch transaction. Any failure discards the whole
    /// batch and rolls back an active transaction before re-raising.
    /// Returns the number of changes flushed.
    pub async fn save_changes(&self) -> StoreResult<u64> {
        let mut active = self.tx_active.lock().await;
        match self.flush("save_changes").await {
            Ok(flushed) => {
                debug!(flushed, "staged changes flushed");
                Ok(flushed)
            }
            Err(err) => {
                if *active {
                    *active = false;
                    if let Err(rollback_err) = self.inner.session.rollback().await {
                        warn!(error = %rollback_err, "rollback after failed flush also failed");
                    }
                }
                warn!(error = %err, "flush failed; staged changes discarded");
                Err(err)
            }
        }
    }

    /// Drains the pending set and applies it. Caller holds the
    /// transaction-state lock and handles rollback on failure.
    async fn flush(&self, operation: &str) -> StoreResult<u64> {
        let batch = self.inner.pending.lock().await.drain();
        if batch.is_empty() {
            return Ok(0);
        }
        let apply = self.inner.session.apply(batch);
        match &self.cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(StoreError::cancelled(operation)),
                    result = apply => result,
                }
            }
            None => apply.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MemoryEngine;
    use crate::models::{CategoryFilter, PromotionFilter};
    use crate::paging::PageRequest;

    fn sample_promotion(code: &str) -> Promotion {
        Promotion::new(
            code,
            10,
            "2024-01-01T00:00:00Z".parse().unwrap(),
            "2024-12-31T00:00:00Z".parse().unwrap(),
        )
    }

    // ========================================================================
    // State machine
    // ========================================================================

    #[tokio::test]
    async fn test_nested_begin_rejected() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();
        assert!(matches!(
            uow.begin().await,
            Err(StoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_commit_while_idle_rejected() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        assert!(matches!(
            uow.commit().await,
            Err(StoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_rollback_while_idle_is_noop() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.rollback().await.unwrap();
        assert!(!uow.in_transaction().await);
    }

    #[tokio::test]
    async fn test_begin_again_after_commit() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();
        uow.commit().await.unwrap();
        assert!(!uow.in_transaction().await);
        uow.begin().await.unwrap();
        assert!(uow.in_transaction().await);
    }

    // ========================================================================
    // Read-your-own-writes
    // ========================================================================

    #[tokio::test]
    async fn test_staged_add_visible_to_own_reads() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();

        let promo = sample_promotion("SAVE10");
        let id = promo.id;
        uow.promotions().add(promo).await.unwrap();

        // Visible before any flush or commit
        let found = uow.promotions().find_by_id(id).await.unwrap();
        assert_eq!(found.unwrap().code, "SAVE10");
        assert_eq!(uow.promotions().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_staged_delete_hides_entity_from_own_reads() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        let category = Category::new("FPS", "fps");
        let id = category.id;
        uow.categories().add(category.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        uow.categories().delete(&category).await.unwrap();
        assert!(uow.categories().find_by_id(id).await.unwrap().is_none());
        assert_eq!(uow.categories().count(None).await.unwrap(), 0);
    }

    // ========================================================================
    // Atomicity
    // ========================================================================

    #[tokio::test]
    async fn test_rollback_discards_staged_add() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();
        uow.promotions().add(sample_promotion("SAVE10")).await.unwrap();
        uow.rollback().await.unwrap();

        let found = uow.promotions().find_by_code("SAVE10").await.unwrap();
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_flush_failure_rolls_back_everything() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();

        // A valid add in one collection plus a delete of a never-persisted
        // entity in another; the NotFound must sink the whole batch.
        uow.categories().add(Category::new("FPS", "fps")).await.unwrap();
        let ghost = sample_promotion("GHOST");
        uow.promotions().delete(&ghost).await.unwrap();

        let result = uow.save_changes().await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        assert!(!uow.in_transaction().await);

        // Nothing is visible to a fresh unit of work
        let fresh = UnitOfWork::open(&engine).await.unwrap();
        assert_eq!(fresh.categories().count(None).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_multi_repository_commit_is_atomic() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();
        uow.categories().add(Category::new("FPS", "fps")).await.unwrap();
        uow.promotions().add(sample_promotion("SAVE10")).await.unwrap();
        uow.commit().await.unwrap();

        let fresh = UnitOfWork::open(&engine).await.unwrap();
        assert_eq!(fresh.categories().count(None).await.unwrap(), 1);
        assert_eq!(fresh.promotions().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_uncommitted_flush_invisible_to_other_sessions() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        uow.begin().await.unwrap();
        uow.categories().add(Category::new("FPS", "fps")).await.unwrap();
        uow.save_changes().await.unwrap();

        let other = UnitOfWork::open(&engine).await.unwrap();
        assert_eq!(other.categories().count(None).await.unwrap(), 0);

        uow.commit().await.unwrap();
        assert_eq!(other.categories().count(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_twice_reports_not_found_at_flush() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        let category = Category::new("FPS", "fps");
        uow.categories().add(category.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        uow.categories().delete(&category).await.unwrap();
        uow.save_changes().await.unwrap();

        // Second delete of the same identity: staged fine, reported at
        // flush, not silently swallowed.
        uow.categories().delete(&category).await.unwrap();
        assert!(matches!(
            uow.save_changes().await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_update_of_unknown_identity_fails_at_flush() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();
        let never_persisted = sample_promotion("SAVE10");
        uow.promotions().update(never_persisted).await.unwrap();
        assert!(matches!(
            uow.save_changes().await,
            Err(StoreError::NotFound { .. })
        ));
    }

    // ========================================================================
    // Cancellation
    // ========================================================================

    #[tokio::test]
    async fn test_cancelled_flush_rolls_back_transaction() {
        let engine = MemoryEngine::new();
        let token = CancellationToken::new();
        let uow = UnitOfWork::open(&engine)
            .await
            .unwrap()
            .with_cancellation(token.clone());

        uow.begin().await.unwrap();
        uow.categories().add(Category::new("FPS", "fps")).await.unwrap();

        token.cancel();
        assert!(matches!(
            uow.save_changes().await,
            Err(StoreError::Cancelled { .. })
        ));
        assert!(!uow.in_transaction().await);

        let fresh = UnitOfWork::open(&engine).await.unwrap();
        assert_eq!(fresh.categories().count(None).await.unwrap(), 0);
    }

    // ========================================================================
    // End-to-end scenarios
    // ========================================================================

    #[tokio::test]
    async fn test_category_search_scenario() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();

        let category = Category::new("FPS", "fps");
        uow.categories().add(category.clone()).await.unwrap();
        uow.save_changes().await.unwrap();

        let filter = CategoryFilter {
            name: Some("fp".to_string()),
            is_active: None,
        };
        let page = uow
            .categories()
            .get_paged(
                PageRequest::new(1, 10).unwrap(),
                Some(filter.predicate().unwrap()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 1);
        assert_eq!(page.items.len(), 1);

        uow.categories().delete(&category).await.unwrap();
        uow.save_changes().await.unwrap();

        let page = uow
            .categories()
            .get_paged(
                PageRequest::new(1, 10).unwrap(),
                Some(filter.predicate().unwrap()),
                None,
            )
            .await
            .unwrap();
        assert_eq!(page.total_count, 0);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn test_promotion_rollback_scenario() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();

        uow.begin().await.unwrap();
        uow.promotions().add(sample_promotion("SAVE10")).await.unwrap();
        uow.rollback().await.unwrap();

        let result = uow
            .promotions()
            .get_first(std::sync::Arc::new(|p: &Promotion| p.code == "SAVE10"))
            .await;
        assert!(matches!(result, Err(StoreError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_filter_conjunction_matches_intersection() {
        let engine = MemoryEngine::new();
        let uow = UnitOfWork::open(&engine).await.unwrap();

        let mut inactive = sample_promotion("SAVEMORE");
        inactive.is_active = false;
        uow.promotions().add(sample_promotion("SAVE10")).await.unwrap();
        uow.promotions().add(inactive).await.unwrap();
        uow.promotions().add(sample_promotion("WELCOME")).await.unwrap();
        uow.save_changes().await.unwrap();

        let code_only = PromotionFilter {
            code: Some("save".to_string()),
            ..Default::default()
        };
        let active_only = PromotionFilter {
            is_active: Some(true),
            ..Default::default()
        };
        let both = PromotionFilter {
            code: Some("save".to_string()),
            is_active: Some(true),
            ..Default::default()
        };

        let repo = uow.promotions();
        let by_code = repo
            .find_all(Some(code_only.predicate().unwrap()))
            .await
            .unwrap();
        let by_active = repo
            .find_all(Some(active_only.predicate().unwrap()))
            .await
            .unwrap();
        let by_both = repo
            .find_all(Some(both.predicate().unwrap()))
            .await
            .unwrap();

        assert_eq!(by_code.len(), 2);
        assert_eq!(by_active.len(), 2);
        assert_eq!(by_both.len(), 1);
        assert_eq!(by_both[0].code, "SAVE10");
    }
}
