//! This modules defines the common functionality for paging data.

use serde::{Deserialize, Serialize};

/// The config for pagination
#[derive(Debug, Clone)]
pub struct PaginationConfig {
    /// The page number to default to when not specified in a request.
    pub default_page: u64,
    /// The number of records per page when not specified in a request.
    pub default_page_size: u64,
    /// The largest page size a client may request.
    pub max_page_size: u64,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page: 1,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// One page of records along with the totals needed to navigate the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// The records on this page, empty if the page is beyond the last page.
    pub items: Vec<T>,
    /// The number of records matching the query across all pages.
    pub total_records: u64,
    /// The number of pages, never less than one.
    pub total_pages: u64,
    /// The page that was requested, even if it lies beyond `total_pages`.
    pub current_page: u64,
}

impl<T> Page<T> {
    /// Whether this page was requested past the last page of results.
    pub fn is_beyond_end(&self) -> bool {
        self.current_page > self.total_pages
    }
}

/// The number of pages needed to show `total_records` with `page_size`
/// records per page.
///
/// An empty result set still has one (empty) page.
pub fn page_count(total_records: u64, page_size: u64) -> u64 {
    if page_size == 0 {
        return 1;
    }

    total_records.div_ceil(page_size).max(1)
}

/// The number of records to skip to reach `page`, or `None` if the offset
/// does not fit in a SQLite integer.
pub fn page_offset(page: u64, page_size: u64) -> Option<i64> {
    page.checked_sub(1)?
        .checked_mul(page_size)
        .and_then(|offset| i64::try_from(offset).ok())
}
