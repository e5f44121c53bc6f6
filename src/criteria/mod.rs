//! Runtime filter construction.
//!
//! Request handlers collect optional query parameters into per-entity
//! filter structs (see `models`); this module translates those sparse
//! criteria into a single composed predicate the repositories can apply.

mod builder;
mod field;

pub use builder::{match_all, Predicate, PredicateBuilder};
pub use field::{Criterion, Field, FieldKind, FieldValue};
