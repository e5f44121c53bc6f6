//! Pending change tracking for one unit of work.

use std::collections::{BTreeMap, HashMap};

use crate::engine::{ChangeOp, Document, StagedChange};
use crate::entity::EntityId;
use crate::error::{StoreError, StoreResult};

/// One staged, not-yet-flushed change to a single entity.
#[derive(Debug, Clone)]
pub(crate) enum PendingOp {
    Insert(Document),
    Update(Document),
    Delete,
}

/// All changes staged since the last flush, keyed by collection then
/// identity. One entry per identity; repeated staging folds into the
/// existing entry.
#[derive(Debug, Default)]
pub(crate) struct ChangeSet {
    changes: HashMap<&'static str, BTreeMap<EntityId, PendingOp>>,
}

impl ChangeSet {
    /// Stages an insert. An identity already tracked in this unit of
    /// work cannot be added again.
    pub fn stage_insert(
        &mut self,
        collection: &'static str,
        id: EntityId,
        doc: Document,
    ) -> StoreResult<()> {
        let entry = self.changes.entry(collection).or_default();
        if entry.contains_key(&id) {
            return Err(StoreError::invalid_argument(format!(
                "{collection} {id} is already staged in this unit of work"
            )));
        }
        entry.insert(id, PendingOp::Insert(doc));
        Ok(())
    }

    /// Stages a full-record replace. An update over a staged insert
    /// folds into the insert; whether the identity exists durably is
    /// resolved at flush time.
    pub fn stage_update(&mut self, collection: &'static str, id: EntityId, doc: Document) {
        let entry = self.changes.entry(collection).or_default();
        match entry.get(&id) {
            Some(PendingOp::Insert(_)) => {
                entry.insert(id, PendingOp::Insert(doc));
            }
            _ => {
                entry.insert(id, PendingOp::Update(doc));
            }
        }
    }

    /// Stages a removal. Deleting a staged insert cancels both; the
    /// entity never existed durably.
    pub fn stage_delete(&mut self, collection: &'static str, id: EntityId) {
        let entry = self.changes.entry(collection).or_default();
        match entry.get(&id) {
            Some(PendingOp::Insert(_)) => {
                entry.remove(&id);
            }
            _ => {
                entry.insert(id, PendingOp::Delete);
            }
        }
    }

    /// Staged changes for one collection, in identity order.
    pub fn for_collection(&self, collection: &str) -> Option<&BTreeMap<EntityId, PendingOp>> {
        self.changes.get(collection)
    }

    /// Whether any change is staged for `collection`.
    pub fn touches(&self, collection: &str) -> bool {
        self.changes
            .get(collection)
            .is_some_and(|entry| !entry.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.changes.values().all(BTreeMap::is_empty)
    }

    /// Drains everything staged into one flat batch, collections in name
    /// order, identities in id order within each.
    pub fn drain(&mut self) -> Vec<StagedChange> {
        let mut collections: Vec<_> = self.changes.drain().collect();
        collections.sort_by_key(|(name, _)| *name);

        let mut batch = Vec::new();
        for (collection, entries) in collections {
            for (id, op) in entries {
                let op = match op {
                    PendingOp::Insert(doc) => ChangeOp::Insert { id, doc },
                    PendingOp::Update(doc) => ChangeOp::Update { id, doc },
                    PendingOp::Delete => ChangeOp::Delete { id },
                };
                batch.push(StagedChange { collection, op });
            }
        }
        batch
    }

    /// Discards everything staged.
    pub fn clear(&mut self) {
        self.changes.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_double_add_rejected() {
        let mut changes = ChangeSet::default();
        let id = EntityId::new();
        changes.stage_insert("categories", id, json!({})).unwrap();
        assert!(matches!(
            changes.stage_insert("categories", id, json!({})),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_update_folds_into_staged_insert() {
        let mut changes = ChangeSet::default();
        let id = EntityId::new();
        changes
            .stage_insert("categories", id, json!({"v": 1}))
            .unwrap();
        changes.stage_update("categories", id, json!({"v": 2}));

        let batch = changes.drain();
        assert_eq!(batch.len(), 1);
        assert!(matches!(&batch[0].op, ChangeOp::Insert { doc, .. } if doc["v"] == 2));
    }

    #[test]
    fn test_delete_cancels_staged_insert() {
        let mut changes = ChangeSet::default();
        let id = EntityId::new();
        changes.stage_insert("categories", id, json!({})).unwrap();
        changes.stage_delete("categories", id);
        assert!(changes.is_empty());
    }

    #[test]
    fn test_drain_orders_collections_by_name() {
        let mut changes = ChangeSet::default();
        changes.stage_delete("promotions", EntityId::new());
        changes.stage_delete("banners", EntityId::new());

        let batch = changes.drain();
        assert_eq!(batch[0].collection, "banners");
        assert_eq!(batch[1].collection, "promotions");
        assert!(changes.is_empty());
    }
}
