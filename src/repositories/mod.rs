//! Repository layer for data access operations.
//!
//! One generic `Repository<T>` covers CRUD and querying for every
//! aggregate; entity-specific queries live in their own files as thin
//! extensions over the generic surface.

mod category_queries;
mod game_account_queries;
mod promotion_queries;
mod repository;

pub use repository::Repository;
