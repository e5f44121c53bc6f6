//! Generic repository over one entity type.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::criteria::{match_all, Predicate};
use crate::engine::{DocComparator, DocPredicate, Document, ScanOptions, ScanWindow};
use crate::entity::{Entity, EntityId};
use crate::error::{StoreError, StoreResult};
use crate::paging::{page_window, OrderBy, PageRequest, PagedResult};
use crate::uow::{PendingOp, SessionInner};

/// CRUD and query surface for one entity type, scoped to one unit of
/// work.
///
/// Reads execute immediately and see the unit of work's own staged
/// writes; `add`/`update`/`delete` only stage, so that several
/// repositories can flush in one atomic batch. When nothing is staged
/// for this collection, filter, order and window are pushed down to the
/// engine session; with staged changes present the repository merges the
/// engine view with the pending set first, so paging totals stay
/// consistent.
pub struct Repository<T: Entity> {
    inner: Arc<SessionInner>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub(crate) fn new(inner: Arc<SessionInner>) -> Self {
        Self {
            inner,
            _entity: PhantomData,
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Looks an entity up by identity, `None` when absent.
    pub async fn find_by_id(&self, id: EntityId) -> StoreResult<Option<T>> {
        {
            let pending = self.inner.pending.lock().await;
            if let Some(op) = pending
                .for_collection(T::COLLECTION)
                .and_then(|entry| entry.get(&id))
            {
                return match op {
                    PendingOp::Insert(doc) | PendingOp::Update(doc) => {
                        Ok(Some(decode::<T>(doc.clone())?))
                    }
                    PendingOp::Delete => Ok(None),
                };
            }
        }
        match self.inner.session.fetch(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(decode(doc)?)),
            None => Ok(None),
        }
    }

    /// Looks an entity up by identity, erroring when absent.
    pub async fn get_by_id(&self, id: EntityId) -> StoreResult<T> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, id))
    }

    /// First entity satisfying `predicate`, in storage order. Callers
    /// needing a deterministic pick must order via `get_paged`.
    pub async fn find_first(&self, predicate: Predicate<T>) -> StoreResult<Option<T>> {
        if self.touched().await {
            return Ok(self
                .load_merged()
                .await?
                .into_iter()
                .find(|entity| predicate(entity)));
        }
        let page = self
            .inner
            .session
            .scan(
                T::COLLECTION,
                ScanOptions {
                    filter: Some(doc_filter(predicate)),
                    order: None,
                    window: Some(ScanWindow {
                        offset: 0,
                        limit: 1,
                    }),
                },
            )
            .await?;
        page.documents.into_iter().next().map(decode).transpose()
    }

    /// Like `find_first` but erroring when nothing matches.
    pub async fn get_first(&self, predicate: Predicate<T>) -> StoreResult<T> {
        self.find_first(predicate)
            .await?
            .ok_or_else(|| StoreError::not_found(T::COLLECTION, "<first match>"))
    }

    /// Full scan under a predicate; `None` means match-all. Intended for
    /// small reference sets.
    pub async fn find_all(&self, predicate: Option<Predicate<T>>) -> StoreResult<Vec<T>> {
        let predicate = predicate.unwrap_or_else(match_all);
        if self.touched().await {
            let mut entities = self.load_merged().await?;
            entities.retain(|entity| predicate(entity));
            return Ok(entities);
        }
        let page = self
            .inner
            .session
            .scan(
                T::COLLECTION,
                ScanOptions {
                    filter: Some(doc_filter(predicate)),
                    order: None,
                    window: None,
                },
            )
            .await?;
        page.documents.into_iter().map(decode).collect()
    }

    /// Filtered, ordered, paged read. `total_count` covers the filtered
    /// set before windowing; a page beyond the last yields empty items
    /// with the correct total.
    pub async fn get_paged(
        &self,
        request: PageRequest,
        predicate: Option<Predicate<T>>,
        order: Option<OrderBy<T>>,
    ) -> StoreResult<PagedResult<T>> {
        request.check()?;
        if request.page_size > self.inner.config.max_page_size {
            return Err(StoreError::invalid_argument(format!(
                "page_size {} exceeds configured maximum {}",
                request.page_size, self.inner.config.max_page_size
            )));
        }
        let predicate = predicate.unwrap_or_else(match_all);

        if !self.touched().await {
            let page = self
                .inner
                .session
                .scan(
                    T::COLLECTION,
                    ScanOptions {
                        filter: Some(doc_filter(predicate)),
                        order: order.map(doc_comparator),
                        window: Some(ScanWindow {
                            offset: request.offset(),
                            limit: request.limit(),
                        }),
                    },
                )
                .await?;
            let items: Vec<T> = page
                .documents
                .into_iter()
                .map(decode)
                .collect::<StoreResult<_>>()?;
            return Ok(PagedResult::new(items, &request, page.total));
        }

        let mut matched = self.load_merged().await?;
        matched.retain(|entity| predicate(entity));
        let total = matched.len() as u64;
        if let Some(order) = order {
            matched.sort_by(|a, b| order.compare(a, b));
        }
        let items: Vec<T> = matched
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit() as usize)
            .collect();
        debug_assert_eq!(
            items.len() as u64,
            page_window(total, request.offset(), request.limit())
        );
        Ok(PagedResult::new(items, &request, total))
    }

    /// Count of entities matching `predicate` (`None` = all).
    pub async fn count(&self, predicate: Option<Predicate<T>>) -> StoreResult<u64> {
        if self.touched().await {
            let predicate = predicate.unwrap_or_else(match_all);
            let entities = self.load_merged().await?;
            return Ok(entities.iter().filter(|entity| predicate(entity)).count() as u64);
        }
        self.inner
            .session
            .count(T::COLLECTION, predicate.map(doc_filter))
            .await
    }

    /// Whether any entity matches `predicate`.
    pub async fn exists(&self, predicate: Predicate<T>) -> StoreResult<bool> {
        Ok(self.find_first(predicate).await?.is_some())
    }

    // ========================================================================
    // Staged writes
    // ========================================================================

    /// Stages an insert; no I/O until the unit of work flushes.
    pub async fn add(&self, entity: T) -> StoreResult<()> {
        let id = entity.id();
        if id.is_nil() {
            return Err(StoreError::invalid_argument(format!(
                "cannot add a {} with a nil identity",
                T::COLLECTION
            )));
        }
        let doc = encode(&entity)?;
        self.inner
            .pending
            .lock()
            .await
            .stage_insert(T::COLLECTION, id, doc)
    }

    /// Stages a full-record replace keyed by identity. An unknown
    /// identity surfaces as `NotFound` at flush, not here.
    pub async fn update(&self, entity: T) -> StoreResult<()> {
        let id = entity.id();
        if id.is_nil() {
            return Err(StoreError::invalid_argument(format!(
                "cannot update a {} with a nil identity",
                T::COLLECTION
            )));
        }
        let doc = encode(&entity)?;
        self.inner
            .pending
            .lock()
            .await
            .stage_update(T::COLLECTION, id, doc);
        Ok(())
    }

    /// Stages a removal keyed by identity. Deleting an identity the
    /// store no longer holds surfaces as `NotFound` at flush.
    pub async fn delete(&self, entity: &T) -> StoreResult<()> {
        let id = entity.id();
        if id.is_nil() {
            return Err(StoreError::invalid_argument(format!(
                "cannot delete a {} with a nil identity",
                T::COLLECTION
            )));
        }
        self.inner
            .pending
            .lock()
            .await
            .stage_delete(T::COLLECTION, id);
        Ok(())
    }

    // ========================================================================
    // Pending overlay
    // ========================================================================

    /// Whether this unit of work has staged changes for the collection.
    async fn touched(&self) -> bool {
        self.inner.pending.lock().await.touches(T::COLLECTION)
    }

    /// Engine view merged with the staged changes, in identity order.
    async fn load_merged(&self) -> StoreResult<Vec<T>> {
        let page = self
            .inner
            .session
            .scan(T::COLLECTION, ScanOptions::default())
            .await?;
        let mut view: BTreeMap<EntityId, T> = BTreeMap::new();
        for doc in page.documents {
            let entity: T = decode(doc)?;
            view.insert(entity.id(), entity);
        }

        let pending = self.inner.pending.lock().await;
        if let Some(entries) = pending.for_collection(T::COLLECTION) {
            for (id, op) in entries {
                match op {
                    PendingOp::Insert(doc) | PendingOp::Update(doc) => {
                        view.insert(*id, decode(doc.clone())?);
                    }
                    PendingOp::Delete => {
                        view.remove(id);
                    }
                }
            }
        }
        Ok(view.into_values().collect())
    }
}

fn decode<T: Entity>(doc: Document) -> StoreResult<T> {
    serde_json::from_value(doc).map_err(|e| {
        StoreError::persistence(format!("decoding a {} document", T::COLLECTION), e)
    })
}

fn encode<T: Entity>(entity: &T) -> StoreResult<Document> {
    serde_json::to_value(entity).map_err(|e| {
        StoreError::persistence(format!("encoding a {} document", T::COLLECTION), e)
    })
}

/// Wraps a typed predicate into a document predicate for pushdown.
/// Documents that fail to decode never match.
fn doc_filter<T: Entity>(predicate: Predicate<T>) -> DocPredicate {
    Arc::new(move |doc| {
        serde_json::from_value::<T>(doc.clone())
            .map(|entity| predicate(&entity))
            .unwrap_or(false)
    })
}

/// Wraps a typed sort descriptor into a document comparator for
/// pushdown. Undecodable documents compare equal, keeping the sort
/// stable.
fn doc_comparator<T: Entity>(order: OrderBy<T>) -> DocComparator {
    Arc::new(move |a, b| {
        let a = serde_json::from_value::<T>(a.clone());
        let b = serde_json::from_value::<T>(b.clone());
        match (a, b) {
            (Ok(a), Ok(b)) => order.compare(&a, &b),
            _ => std::cmp::Ordering::Equal,
        }
    })
}
