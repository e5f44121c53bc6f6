//! Paging and ordering primitives for repository queries.

use std::cmp::Ordering;
use std::sync::Arc;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{StoreError, StoreResult};

/// Requested page for a paged read.
#[derive(Debug, Clone, Copy, Deserialize, Validate)]
pub struct PageRequest {
    /// Page number (1-based)
    #[serde(default = "default_page")]
    #[validate(range(min = 1, message = "Page must be at least 1"))]
    pub page: u32,

    /// Number of items per page
    #[serde(default = "default_page_size")]
    #[validate(range(min = 1, message = "Page size must be at least 1"))]
    pub page_size: u32,
}

impl PageRequest {
    /// Creates a validated page request.
    pub fn new(page: u32, page_size: u32) -> StoreResult<Self> {
        let request = Self { page, page_size };
        request.check()?;
        Ok(request)
    }

    /// Runs validation, mapping failures to `InvalidArgument`.
    pub(crate) fn check(&self) -> StoreResult<()> {
        self.validate()
            .map_err(|e| StoreError::invalid_argument(e.to_string()))
    }

    /// Calculates the scan offset for this page.
    pub fn offset(&self) -> u64 {
        (self.page as u64 - 1) * self.page_size as u64
    }

    /// Returns the scan limit for this page.
    pub fn limit(&self) -> u64 {
        self.page_size as u64
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

/// Number of items a consistent snapshot yields for a window over
/// `total` filtered entities.
pub(crate) fn page_window(total: u64, offset: u64, limit: u64) -> u64 {
    total.saturating_sub(offset).min(limit)
}

/// One page of query results with the pre-paging total.
#[derive(Debug, Clone, Serialize)]
pub struct PagedResult<T> {
    /// The items for this page, already ordered
    pub items: Vec<T>,

    /// Total number of entities matching the filter, ignoring paging
    pub total_count: u64,

    /// Current page number (1-based)
    pub page: u32,

    /// Number of items per page
    pub page_size: u32,

    /// Total number of pages
    pub total_pages: u32,

    /// Whether there is a next page
    pub has_next: bool,

    /// Whether there is a previous page
    pub has_prev: bool,
}

impl<T> PagedResult<T> {
    /// Creates a paged result, deriving the page metadata.
    pub fn new(items: Vec<T>, request: &PageRequest, total_count: u64) -> Self {
        let total_pages = total_count.div_ceil(request.page_size as u64) as u32;
        Self {
            items,
            total_count,
            page: request.page,
            page_size: request.page_size,
            total_pages,
            has_next: request.page < total_pages,
            has_prev: request.page > 1,
        }
    }
}

// ============================================================================
// Ordering
// ============================================================================

/// Totally ordered key extracted from an entity for sorting.
///
/// Floats are deliberately absent; money is modelled as integer cents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortKey {
    Flag(bool),
    Integer(i64),
    Text(String),
    Timestamp(Timestamp),
}

impl SortKey {
    fn rank(&self) -> u8 {
        match self {
            SortKey::Flag(_) => 0,
            SortKey::Integer(_) => 1,
            SortKey::Text(_) => 2,
            SortKey::Timestamp(_) => 3,
        }
    }
}

impl Ord for SortKey {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (SortKey::Flag(a), SortKey::Flag(b)) => a.cmp(b),
            (SortKey::Integer(a), SortKey::Integer(b)) => a.cmp(b),
            (SortKey::Text(a), SortKey::Text(b)) => a.cmp(b),
            (SortKey::Timestamp(a), SortKey::Timestamp(b)) => a.cmp(b),
            // Mixed kinds only appear when a caller sorts a heterogeneous
            // key set; order by kind so the sort stays total.
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl PartialOrd for SortKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sort descriptor for paged reads: a key extractor plus direction.
pub struct OrderBy<T> {
    key: Arc<dyn Fn(&T) -> SortKey + Send + Sync>,
    descending: bool,
}

impl<T> OrderBy<T> {
    /// Ascending order over the extracted key.
    pub fn asc(key: impl Fn(&T) -> SortKey + Send + Sync + 'static) -> Self {
        Self {
            key: Arc::new(key),
            descending: false,
        }
    }

    /// Descending order over the extracted key.
    pub fn desc(key: impl Fn(&T) -> SortKey + Send + Sync + 'static) -> Self {
        Self {
            key: Arc::new(key),
            descending: true,
        }
    }

    /// Extracts the sort key from one entity.
    pub fn key(&self, entity: &T) -> SortKey {
        (self.key)(entity)
    }

    /// Whether the direction is descending.
    pub fn descending(&self) -> bool {
        self.descending
    }

    /// Compares two entities under this descriptor.
    pub(crate) fn compare(&self, a: &T, b: &T) -> Ordering {
        let ordering = self.key(a).cmp(&self.key(b));
        if self.descending {
            ordering.reverse()
        } else {
            ordering
        }
    }
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            key: Arc::clone(&self.key),
            descending: self.descending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // ========================================================================
    // PageRequest tests
    // ========================================================================

    #[test]
    fn test_page_request_valid() {
        let request = PageRequest::new(1, 20).unwrap();
        assert_eq!(request.offset(), 0);
        assert_eq!(request.limit(), 20);
    }

    #[test]
    fn test_page_request_rejects_zero_page() {
        assert!(matches!(
            PageRequest::new(0, 20),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_page_request_rejects_zero_page_size() {
        assert!(matches!(
            PageRequest::new(1, 0),
            Err(StoreError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn test_page_request_offset() {
        let request = PageRequest::new(3, 10).unwrap();
        assert_eq!(request.offset(), 20);
    }

    #[test]
    fn test_page_request_deserialize_defaults() {
        let request: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(request.page, 1);
        assert_eq!(request.page_size, 20);
    }

    // ========================================================================
    // PagedResult tests
    // ========================================================================

    #[test]
    fn test_paged_result_metadata() {
        let request = PageRequest::new(2, 10).unwrap();
        let result = PagedResult::new(vec![1; 10], &request, 35);
        assert_eq!(result.total_pages, 4);
        assert!(result.has_next);
        assert!(result.has_prev);
    }

    #[test]
    fn test_paged_result_empty() {
        let request = PageRequest::new(1, 10).unwrap();
        let result: PagedResult<i32> = PagedResult::new(vec![], &request, 0);
        assert_eq!(result.total_pages, 0);
        assert!(!result.has_next);
        assert!(!result.has_prev);
    }

    // ========================================================================
    // SortKey tests
    // ========================================================================

    #[test]
    fn test_sort_key_text_ordering() {
        assert!(SortKey::Text("a".into()) < SortKey::Text("b".into()));
    }

    #[test]
    fn test_sort_key_timestamp_ordering() {
        let earlier: Timestamp = "2024-01-01T00:00:00Z".parse().unwrap();
        let later: Timestamp = "2024-06-01T00:00:00Z".parse().unwrap();
        assert!(SortKey::Timestamp(earlier) < SortKey::Timestamp(later));
    }

    #[test]
    fn test_order_by_desc_reverses() {
        let order = OrderBy::<i64>::desc(|n| SortKey::Integer(*n));
        assert_eq!(order.compare(&1, &2), Ordering::Greater);
    }

    // ========================================================================
    // Window arithmetic property
    // ========================================================================

    proptest! {
        #[test]
        fn prop_page_window_matches_slice(
            total in 0u64..500,
            page in 1u32..50,
            page_size in 1u32..50,
        ) {
            let request = PageRequest::new(page, page_size).unwrap();
            let all: Vec<u64> = (0..total).collect();
            let taken = all
                .iter()
                .skip(request.offset() as usize)
                .take(request.limit() as usize)
                .count() as u64;
            prop_assert_eq!(
                taken,
                page_window(total, request.offset(), request.limit())
            );
        }
    }
}
