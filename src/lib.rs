//! GameMart data-access core.
//!
//! Transactional data layer for the GameMart back office: a generic
//! repository per aggregate, runtime filter construction from sparse
//! search criteria, and a unit of work coordinating atomic multi-entity
//! writes over a pluggable storage engine.
//!
//! Request handlers open one [`uow::UnitOfWork`] per request, build
//! predicates from the per-entity filter structs in [`models`], run
//! queries through the repositories, and either commit an explicit
//! transaction or call `save_changes` for a single-batch write.

pub mod config;
pub mod criteria;
pub mod engine;
pub mod entity;
pub mod error;
pub mod models;
pub mod paging;
pub mod repositories;
pub mod uow;

pub use config::StoreConfig;
pub use entity::{Entity, EntityId};
pub use error::{StoreError, StoreResult};
pub use paging::{OrderBy, PageRequest, PagedResult, SortKey};
pub use repositories::Repository;
pub use uow::UnitOfWork;
