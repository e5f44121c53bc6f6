//! Persistence engine contract and the in-memory reference engine.
//!
//! The rest of the crate only depends on the `StorageEngine` /
//! `EngineSession` traits; `MemoryEngine` is one substitutable backend.

mod memory;
mod traits;

pub use memory::MemoryEngine;
pub use traits::{
    ChangeOp, DocComparator, DocPredicate, Document, EngineSession, ScanOptions, ScanPage,
    ScanWindow, StagedChange, StorageEngine,
};
