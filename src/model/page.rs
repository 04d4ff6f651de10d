//! Paginated listings.

use serde::Serialize;

/// Smallest and largest page size a listing accepts.
pub const MIN_LIMIT: u32 = 20;
pub const MAX_LIMIT: u32 = 250;

/// A validated page request. Pages are zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    page: u32,
    limit: u32,
}

impl Paging {
    /// Validates a page request. Returns a message describing the problem
    /// when the limit is out of range.
    pub fn new(page: u32, limit: u32) -> Result<Self, String> {
        if !(MIN_LIMIT..=MAX_LIMIT).contains(&limit) {
            return Err(format!(
                "limit must be between {MIN_LIMIT} and {MAX_LIMIT}, got {limit}"
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn page(self) -> u32 {
        self.page
    }

    pub fn limit(self) -> u32 {
        self.limit
    }

    pub fn offset(self) -> u64 {
        u64::from(self.page) * u64::from(self.limit)
    }
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            page: 0,
            limit: MIN_LIMIT,
        }
    }
}

/// One page of a listing ordered by last modification, newest first.
///
/// `previous_page` and `next_page` are `-1` when there is no such page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub total_records: u64,
    pub total_pages: u64,
    pub previous_page: i64,
    pub next_page: i64,
    pub has_previous_page: bool,
    pub has_next_page: bool,
    pub records: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total_records: u64, paging: Paging) -> Self {
        let limit = u64::from(paging.limit());
        let page = i64::from(paging.page());
        let total_pages = total_records.div_ceil(limit);
        let has_previous_page = page > 0;
        let has_next_page = u64::from(paging.page()) + 1 < total_pages;
        Self {
            total_records,
            total_pages,
            previous_page: if has_previous_page { page - 1 } else { -1 },
            next_page: if has_next_page { page + 1 } else { -1 },
            has_previous_page,
            has_next_page,
            records,
        }
    }

    /// Converts every record, keeping the page metadata.
    pub fn try_map<U, E>(self, f: impl FnMut(T) -> Result<U, E>) -> Result<Page<U>, E> {
        Ok(Page {
            total_records: self.total_records,
            total_pages: self.total_pages,
            previous_page: self.previous_page,
            next_page: self.next_page,
            has_previous_page: self.has_previous_page,
            has_next_page: self.has_next_page,
            records: self.records.into_iter().map(f).collect::<Result<_, _>>()?,
        })
    }
}
