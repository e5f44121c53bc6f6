//! Field descriptors and criterion values for runtime filters.

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use jiff::Timestamp;

/// Declared kind of a filterable entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Flag,
    Integer,
    Timestamp,
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldKind::Text => "text",
            FieldKind::Flag => "flag",
            FieldKind::Integer => "integer",
            FieldKind::Timestamp => "timestamp",
        };
        f.write_str(name)
    }
}

/// A value extracted from an entity field, or supplied as a criterion.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Flag(bool),
    Integer(i64),
    Timestamp(Timestamp),
}

impl FieldValue {
    /// The kind this value belongs to.
    pub fn kind(&self) -> FieldKind {
        match self {
            FieldValue::Text(_) => FieldKind::Text,
            FieldValue::Flag(_) => FieldKind::Flag,
            FieldValue::Integer(_) => FieldKind::Integer,
            FieldValue::Timestamp(_) => FieldKind::Timestamp,
        }
    }

    /// Compares two values of the same orderable kind.
    ///
    /// Returns `None` for kind mismatches and for kinds without a
    /// meaningful range order (text, flag).
    pub(crate) fn range_cmp(&self, other: &FieldValue) -> Option<Ordering> {
        match (self, other) {
            (FieldValue::Integer(a), FieldValue::Integer(b)) => Some(a.cmp(b)),
            (FieldValue::Timestamp(a), FieldValue::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// A single optional constraint over one field.
///
/// Absent constraints are expressed as `None` at the builder, so every
/// `Criterion` value that reaches the builder is present by definition.
#[derive(Debug, Clone)]
pub enum Criterion {
    /// Exact match
    Equals(FieldValue),
    /// Case-insensitive substring match over a text field
    Contains(String),
    /// Inclusive lower bound over an integer or timestamp field
    AtLeast(FieldValue),
    /// Inclusive upper bound over an integer or timestamp field
    AtMost(FieldValue),
}

/// Descriptor binding a field name and kind to its extractor.
pub struct Field<T> {
    name: &'static str,
    kind: FieldKind,
    extract: Arc<dyn Fn(&T) -> FieldValue + Send + Sync>,
}

impl<T> Field<T> {
    pub fn text(name: &'static str, extract: impl Fn(&T) -> String + Send + Sync + 'static) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
            extract: Arc::new(move |entity| FieldValue::Text(extract(entity))),
        }
    }

    pub fn flag(name: &'static str, extract: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        Self {
            name,
            kind: FieldKind::Flag,
            extract: Arc::new(move |entity| FieldValue::Flag(extract(entity))),
        }
    }

    pub fn integer(
        name: &'static str,
        extract: impl Fn(&T) -> i64 + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Integer,
            extract: Arc::new(move |entity| FieldValue::Integer(extract(entity))),
        }
    }

    pub fn timestamp(
        name: &'static str,
        extract: impl Fn(&T) -> Timestamp + Send + Sync + 'static,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::Timestamp,
            extract: Arc::new(move |entity| FieldValue::Timestamp(extract(entity))),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub(crate) fn extractor(&self) -> Arc<dyn Fn(&T) -> FieldValue + Send + Sync> {
        Arc::clone(&self.extract)
    }
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            kind: self.kind,
            extract: Arc::clone(&self.extract),
        }
    }
}
