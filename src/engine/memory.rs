//! In-memory storage engine.
//!
//! Reference implementation of the engine contract, used by the test
//! suite and for embedded deployments. Collections live in one shared
//! map behind a single `RwLock`; a multi-collection commit is one write
//! lock scope and therefore atomic. Each session carries an optional
//! transaction overlay merged over the base for its own reads.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::engine::{
    ChangeOp, DocPredicate, Document, EngineSession, ScanOptions, ScanPage, StagedChange,
    StorageEngine,
};
use crate::entity::EntityId;
use crate::error::{StoreError, StoreResult};

/// Base store: collection name to id-ordered documents. The `BTreeMap`
/// gives scans a stable default order.
type Collections = HashMap<String, BTreeMap<EntityId, Document>>;

/// Transaction overlay: `None` marks a document deleted in this
/// transaction.
type Overlay = HashMap<String, BTreeMap<EntityId, Option<Document>>>;

/// Shared in-memory engine. Cloning shares the underlying store.
#[derive(Clone, Default)]
pub struct MemoryEngine {
    shared: Arc<RwLock<Collections>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageEngine for MemoryEngine {
    async fn open_session(&self) -> StoreResult<Box<dyn EngineSession>> {
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.shared),
            overlay: Mutex::new(None),
        }))
    }
}

/// One session against a `MemoryEngine`.
struct MemorySession {
    shared: Arc<RwLock<Collections>>,
    overlay: Mutex<Option<Overlay>>,
}

impl MemorySession {
    /// Session-local view of one collection: base merged with the
    /// transaction overlay, in id order.
    async fn merged(&self, collection: &str) -> BTreeMap<EntityId, Document> {
        let overlay = self.overlay.lock().await;
        let base = self.shared.read().await;
        let mut view = base.get(collection).cloned().unwrap_or_default();
        if let Some(overlay) = overlay.as_ref()
            && let Some(changes) = overlay.get(collection)
        {
            for (id, doc) in changes {
                match doc {
                    Some(doc) => {
                        view.insert(*id, doc.clone());
                    }
                    None => {
                        view.remove(id);
                    }
                }
            }
        }
        view
    }
}

/// Validates every change in `batch` against `exists` before anything is
/// applied; first failure rejects the whole batch.
fn validate_batch(
    batch: &[StagedChange],
    exists: impl Fn(&str, EntityId) -> bool,
) -> StoreResult<()> {
    for change in batch {
        let id = change.op.id();
        match &change.op {
            ChangeOp::Insert { .. } => {
                if exists(change.collection, id) {
                    return Err(StoreError::conflict(format!(
                        "{} {id} already exists",
                        change.collection
                    )));
                }
            }
            ChangeOp::Update { .. } | ChangeOp::Delete { .. } => {
                if !exists(change.collection, id) {
                    return Err(StoreError::not_found(change.collection, id));
                }
            }
        }
    }
    Ok(())
}

#[async_trait]
impl EngineSession for MemorySession {
    async fn fetch(&self, collection: &str, id: EntityId) -> StoreResult<Option<Document>> {
        Ok(self.merged(collection).await.get(&id).cloned())
    }

    async fn scan(&self, collection: &str, options: ScanOptions) -> StoreResult<ScanPage> {
        let mut documents: Vec<Document> = self.merged(collection).await.into_values().collect();
        if let Some(filter) = &options.filter {
            documents.retain(|doc| filter(doc));
        }
        let total = documents.len() as u64;
        if let Some(order) = &options.order {
            documents.sort_by(|a, b| order(a, b));
        }
        if let Some(window) = options.window {
            documents = documents
                .into_iter()
                .skip(window.offset as usize)
                .take(window.limit as usize)
                .collect();
        }
        Ok(ScanPage { documents, total })
    }

    async fn count(&self, collection: &str, filter: Option<DocPredicate>) -> StoreResult<u64> {
        let view = self.merged(collection).await;
        let count = match filter {
            Some(filter) => view.values().filter(|doc| filter(doc)).count(),
            None => view.len(),
        };
        Ok(count as u64)
    }

    async fn apply(&self, batch: Vec<StagedChange>) -> StoreResult<u64> {
        let applied = batch.len() as u64;
        let mut overlay_guard = self.overlay.lock().await;

        match overlay_guard.as_mut() {
            Some(overlay) => {
                // Transactional apply: validate against base + overlay,
                // then stage into the overlay only.
                let base = self.shared.read().await;
                validate_batch(&batch, |collection, id| {
                    match overlay.get(collection).and_then(|c| c.get(&id)) {
                        Some(doc) => doc.is_some(),
                        None => base
                            .get(collection)
                            .is_some_and(|c| c.contains_key(&id)),
                    }
                })?;
                drop(base);
                for change in batch {
                    let entry = overlay.entry(change.collection.to_string()).or_default();
                    match change.op {
                        ChangeOp::Insert { id, doc } | ChangeOp::Update { id, doc } => {
                            entry.insert(id, Some(doc));
                        }
                        ChangeOp::Delete { id } => {
                            entry.insert(id, None);
                        }
                    }
                }
            }
            None => {
                // Implicit transaction: one write lock scope.
                let mut base = self.shared.write().await;
                validate_batch(&batch, |collection, id| {
                    base.get(collection).is_some_and(|c| c.contains_key(&id))
                })?;
                for change in batch {
                    let entry = base.entry(change.collection.to_string()).or_default();
                    match change.op {
                        ChangeOp::Insert { id, doc } | ChangeOp::Update { id, doc } => {
                            entry.insert(id, doc);
                        }
                        ChangeOp::Delete { id } => {
                            entry.remove(&id);
                        }
                    }
                }
            }
        }

        debug!(applied, "applied change batch");
        Ok(applied)
    }

    async fn begin(&self) -> StoreResult<()> {
        let mut overlay = self.overlay.lock().await;
        if overlay.is_some() {
            return Err(StoreError::invalid_state(
                "engine transaction already open on this session",
            ));
        }
        *overlay = Some(Overlay::new());
        Ok(())
    }

    async fn commit(&self) -> StoreResult<()> {
        let mut overlay_guard = self.overlay.lock().await;
        let Some(overlay) = overlay_guard.take() else {
            return Err(StoreError::invalid_state(
                "no engine transaction open on this session",
            ));
        };
        let mut base = self.shared.write().await;
        let mut written = 0usize;
        for (collection, changes) in overlay {
            let entry = base.entry(collection).or_default();
            for (id, doc) in changes {
                written += 1;
                match doc {
                    Some(doc) => {
                        entry.insert(id, doc);
                    }
                    None => {
                        entry.remove(&id);
                    }
                }
            }
        }
        debug!(written, "committed engine transaction");
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        let mut overlay = self.overlay.lock().await;
        if overlay.take().is_none() {
            return Err(StoreError::invalid_state(
                "no engine transaction open on this session",
            ));
        }
        debug!("rolled back engine transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn insert(collection: &'static str, id: EntityId, doc: Document) -> StagedChange {
        StagedChange {
            collection,
            op: ChangeOp::Insert { id, doc },
        }
    }

    #[tokio::test]
    async fn test_apply_and_fetch() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        let id = EntityId::new();

        session
            .apply(vec![insert("categories", id, json!({"name": "FPS"}))])
            .await
            .unwrap();

        let doc = session.fetch("categories", id).await.unwrap().unwrap();
        assert_eq!(doc["name"], "FPS");
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        let good = EntityId::new();
        let missing = EntityId::new();

        let result = session
            .apply(vec![
                insert("categories", good, json!({"name": "FPS"})),
                StagedChange {
                    collection: "banners",
                    op: ChangeOp::Delete { id: missing },
                },
            ])
            .await;

        assert!(matches!(result, Err(StoreError::NotFound { .. })));
        // The valid insert must not have landed either
        assert!(session.fetch("categories", good).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_conflicts() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        let id = EntityId::new();

        session
            .apply(vec![insert("categories", id, json!({"name": "FPS"}))])
            .await
            .unwrap();
        let result = session
            .apply(vec![insert("categories", id, json!({"name": "MMO"}))])
            .await;
        assert!(matches!(result, Err(StoreError::Conflict { .. })));
    }

    #[tokio::test]
    async fn test_uncommitted_writes_invisible_to_other_sessions() {
        let engine = MemoryEngine::new();
        let writer = engine.open_session().await.unwrap();
        let reader = engine.open_session().await.unwrap();
        let id = EntityId::new();

        writer.begin().await.unwrap();
        writer
            .apply(vec![insert("categories", id, json!({"name": "FPS"}))])
            .await
            .unwrap();

        // Writer sees its own write, reader does not
        assert!(writer.fetch("categories", id).await.unwrap().is_some());
        assert!(reader.fetch("categories", id).await.unwrap().is_none());

        writer.commit().await.unwrap();
        assert!(reader.fetch("categories", id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_rollback_discards_overlay() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        let id = EntityId::new();

        session.begin().await.unwrap();
        session
            .apply(vec![insert("promotions", id, json!({"code": "SAVE10"}))])
            .await
            .unwrap();
        session.rollback().await.unwrap();

        assert!(session.fetch("promotions", id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_nested_begin_rejected() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        session.begin().await.unwrap();
        assert!(matches!(
            session.begin().await,
            Err(StoreError::InvalidState { .. })
        ));
    }

    #[tokio::test]
    async fn test_scan_window_and_total() {
        let engine = MemoryEngine::new();
        let session = engine.open_session().await.unwrap();
        for n in 0..5 {
            session
                .apply(vec![insert("banners", EntityId::new(), json!({"n": n}))])
                .await
                .unwrap();
        }

        let page = session
            .scan(
                "banners",
                ScanOptions {
                    filter: None,
                    order: None,
                    window: Some(crate::engine::ScanWindow { offset: 3, limit: 10 }),
                },
            )
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.documents.len(), 2);
    }
}
