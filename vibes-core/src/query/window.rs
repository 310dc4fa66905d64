//! Pagination window and paged results

use serde::ser::{Serialize, SerializeStruct, Serializer};

use crate::validation::ValidationError;

/// Default items per page
pub const DEFAULT_PAGE_SIZE: u32 = 100;

/// Pagination window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Page number (1-indexed)
    pub page: u32,
    /// Items per page
    pub size: u32,
}

impl Window {
    /// Create a window, rejecting `page < 1` and `size < 1`.
    pub fn new(page: i64, size: i64) -> Result<Self, ValidationError> {
        Ok(Self {
            page: bounded("page", page)?,
            size: bounded("size", size)?,
        })
    }

    /// Calculate SQL OFFSET value.
    pub fn offset(&self) -> u64 {
        (u64::from(self.page) - 1) * u64::from(self.size)
    }

    /// Get LIMIT value.
    pub fn limit(&self) -> u64 {
        u64::from(self.size)
    }

    /// Number of pages needed for `total` records.
    pub fn pages(&self, total: i64) -> u32 {
        let total = u64::try_from(total).unwrap_or(0);
        let pages = total.div_ceil(u64::from(self.size));
        u32::try_from(pages).unwrap_or(u32::MAX)
    }
}

impl Default for Window {
    fn default() -> Self {
        Self {
            page: 1,
            size: DEFAULT_PAGE_SIZE,
        }
    }
}

fn bounded(field: &'static str, value: i64) -> Result<u32, ValidationError> {
    u32::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or(ValidationError::OutOfRange {
            field,
            min: 1,
            max: i64::from(u32::MAX),
        })
}

/// One page of records plus the total over the whole filtered set
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub records: Vec<T>,
    /// Total count across all pages
    pub total: i64,
    pub window: Window,
}

impl<T> Page<T> {
    pub fn pages(&self) -> u32 {
        self.window.pages(self.total)
    }

    /// Check if there's a next page.
    pub fn has_next(&self) -> bool {
        self.window.page < self.pages()
    }

    /// Check if there's a previous page.
    pub fn has_prev(&self) -> bool {
        self.window.page > 1
    }
}

/// Renders as `{data, total, page, size, pages}`.
impl<T: Serialize> Serialize for Page<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Page", 5)?;
        s.serialize_field("data", &self.records)?;
        s.serialize_field("total", &self.total)?;
        s.serialize_field("page", &self.window.page)?;
        s.serialize_field("size", &self.window.size)?;
        s.serialize_field("pages", &self.pages())?;
        s.end()
    }
}
