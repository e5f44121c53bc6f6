//! Storage engine contract.
//!
//! The data-access core talks to persistence through these object-safe
//! traits. Entities cross the boundary type-erased as JSON documents, so
//! any relational or document store able to satisfy the contract is
//! substitutable.

use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;

use crate::entity::EntityId;
use crate::error::StoreResult;

/// Type-erased entity record.
pub type Document = serde_json::Value;

/// Pushed-down filter over raw documents.
pub type DocPredicate = Arc<dyn Fn(&Document) -> bool + Send + Sync>;

/// Pushed-down sort comparator over raw documents.
pub type DocComparator = Arc<dyn Fn(&Document, &Document) -> Ordering + Send + Sync>;

/// Offset/limit window applied after filtering and ordering.
#[derive(Debug, Clone, Copy)]
pub struct ScanWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Options for a collection scan: filter, then order, then window.
#[derive(Default)]
pub struct ScanOptions {
    pub filter: Option<DocPredicate>,
    pub order: Option<DocComparator>,
    pub window: Option<ScanWindow>,
}

/// Result of a scan: the windowed documents plus the total number of
/// documents that matched the filter before windowing.
pub struct ScanPage {
    pub documents: Vec<Document>,
    pub total: u64,
}

/// One change in an atomic batch.
pub struct StagedChange {
    pub collection: &'static str,
    pub op: ChangeOp,
}

/// The kind of change being applied.
pub enum ChangeOp {
    Insert { id: EntityId, doc: Document },
    Update { id: EntityId, doc: Document },
    Delete { id: EntityId },
}

impl ChangeOp {
    pub fn id(&self) -> EntityId {
        match self {
            ChangeOp::Insert { id, .. } | ChangeOp::Update { id, .. } | ChangeOp::Delete { id } => {
                *id
            }
        }
    }
}

/// One logical session against the engine.
///
/// A session is exclusively owned by one unit of work for its lifetime.
/// Writes made inside an open transaction are visible to this session's
/// own reads but not to other sessions until `commit`.
#[async_trait]
pub trait EngineSession: Send + Sync {
    /// Point lookup by identity.
    async fn fetch(&self, collection: &str, id: EntityId) -> StoreResult<Option<Document>>;

    /// Filtered, ordered, windowed scan returning the page and the
    /// pre-window total.
    async fn scan(&self, collection: &str, options: ScanOptions) -> StoreResult<ScanPage>;

    /// Count of documents matching the filter.
    async fn count(&self, collection: &str, filter: Option<DocPredicate>) -> StoreResult<u64>;

    /// Applies the batch atomically; either every change lands or none
    /// does. With an open transaction the batch lands in the transaction's
    /// scope, otherwise it applies as an implicit single-batch
    /// transaction. Returns the number of changes applied.
    async fn apply(&self, batch: Vec<StagedChange>) -> StoreResult<u64>;

    /// Opens a transaction on this session.
    async fn begin(&self) -> StoreResult<()>;

    /// Durably applies everything written since `begin`.
    async fn commit(&self) -> StoreResult<()>;

    /// Discards everything written since `begin`.
    async fn rollback(&self) -> StoreResult<()>;
}

/// Factory for engine sessions.
#[async_trait]
pub trait StorageEngine: Send + Sync {
    async fn open_session(&self) -> StoreResult<Box<dyn EngineSession>>;
}
