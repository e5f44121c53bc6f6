//! Entity identity and the base trait every persisted aggregate implements.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// Opaque identity key for a persisted aggregate.
///
/// Generated once at entity construction and never reassigned. The `Ord`
/// impl gives the engine a stable default iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Generates a fresh identity.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil identity, never valid for persistence.
    pub fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Whether this is the nil identity.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Base contract for persisted aggregates.
///
/// Implementors carry their own identity and name the engine collection
/// they live in. Repositories and the unit of work only ever talk to
/// entities through this trait.
pub trait Entity: Clone + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Engine collection name for this aggregate type.
    const COLLECTION: &'static str;

    /// The aggregate's identity key.
    fn id(&self) -> EntityId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_is_unique() {
        assert_ne!(EntityId::new(), EntityId::new());
    }

    #[test]
    fn test_nil_entity_id() {
        assert!(EntityId::nil().is_nil());
        assert!(!EntityId::new().is_nil());
    }

    #[test]
    fn test_entity_id_serde_transparent() {
        let id = EntityId::new();
        let json = serde_json::to_string(&id).unwrap();
        // A bare string, not an object
        assert!(json.starts_with('"'));
        let back: EntityId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, back);
    }
}
