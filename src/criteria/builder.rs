//! Conjunctive predicate construction from sparse filter criteria.

use std::cmp::Ordering;
use std::sync::Arc;

use crate::criteria::{Criterion, Field, FieldKind, FieldValue};
use crate::error::{StoreError, StoreResult};

/// Boolean predicate over one entity instance.
pub type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// The constant-true predicate; matches every entity.
pub fn match_all<T>() -> Predicate<T> {
    Arc::new(|_| true)
}

/// Builds one predicate out of a set of optional per-field criteria.
///
/// Fields are visited in the order the caller declares them; each present
/// criterion becomes one atomic comparison and the atoms are combined with
/// logical AND. No present criteria yields the match-all predicate.
///
/// Supplying a criterion whose kind is incompatible with the field's
/// declared kind is a programming error and fails fast with
/// `InvalidArgument` rather than silently coercing.
pub struct PredicateBuilder<T> {
    atoms: Vec<Predicate<T>>,
}

impl<T: 'static> PredicateBuilder<T> {
    pub fn new() -> Self {
        Self { atoms: Vec::new() }
    }

    /// Adds one atom when `criterion` is present; absent criteria impose
    /// no constraint.
    pub fn field(mut self, field: Field<T>, criterion: Option<Criterion>) -> StoreResult<Self> {
        let Some(criterion) = criterion else {
            return Ok(self);
        };

        let extract = field.extractor();
        let atom: Predicate<T> = match criterion {
            Criterion::Equals(value) => {
                if value.kind() != field.kind() {
                    return Err(kind_mismatch(&field, "equals", value.kind()));
                }
                Arc::new(move |entity| extract(entity) == value)
            }
            Criterion::Contains(needle) => {
                if field.kind() != FieldKind::Text {
                    return Err(StoreError::invalid_argument(format!(
                        "filter on '{}': contains requires a text field, field is {}",
                        field.name(),
                        field.kind(),
                    )));
                }
                let needle = needle.to_lowercase();
                Arc::new(move |entity| match extract(entity) {
                    FieldValue::Text(haystack) => haystack.to_lowercase().contains(&needle),
                    _ => false,
                })
            }
            Criterion::AtLeast(bound) => {
                check_range_kind(&field, "at-least", &bound)?;
                Arc::new(move |entity| {
                    extract(entity)
                        .range_cmp(&bound)
                        .is_some_and(|ordering| ordering != Ordering::Less)
                })
            }
            Criterion::AtMost(bound) => {
                check_range_kind(&field, "at-most", &bound)?;
                Arc::new(move |entity| {
                    extract(entity)
                        .range_cmp(&bound)
                        .is_some_and(|ordering| ordering != Ordering::Greater)
                })
            }
        };

        self.atoms.push(atom);
        Ok(self)
    }

    /// Combines the collected atoms with logical AND.
    pub fn build(self) -> Predicate<T> {
        if self.atoms.is_empty() {
            return match_all();
        }
        let atoms = self.atoms;
        Arc::new(move |entity| atoms.iter().all(|atom| atom(entity)))
    }
}

impl<T: 'static> Default for PredicateBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn check_range_kind<T>(field: &Field<T>, op: &str, bound: &FieldValue) -> StoreResult<()> {
    if !matches!(field.kind(), FieldKind::Integer | FieldKind::Timestamp) {
        return Err(StoreError::invalid_argument(format!(
            "filter on '{}': {op} requires an integer or timestamp field, field is {}",
            field.name(),
            field.kind(),
        )));
    }
    if bound.kind() != field.kind() {
        return Err(kind_mismatch(field, op, bound.kind()));
    }
    Ok(())
}

fn kind_mismatch<T>(field: &Field<T>, op: &str, supplied: FieldKind) -> StoreError {
    StoreError::invalid_argument(format!(
        "filter on '{}': {op} criterion of kind {supplied} does not match {} field",
        field.name(),
        field.kind(),
    ))
}
