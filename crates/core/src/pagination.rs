//! Page/limit handling for story listings.
//!
//! Listings are addressed by 1-based page number. Offsets are computed as
//! `(page - 1) * limit` after clamping, so a caller-supplied `page < 1` can
//! never produce a negative offset.

use serde::Deserialize;

/// Default page size when the caller omits `limit`.
pub const DEFAULT_PAGE_LIMIT: i64 = 20;

/// Largest page a caller may request.
pub const MAX_PAGE_LIMIT: i64 = 100;

/// Raw `?page=&limit=` query parameters.
#[derive(Debug, Default, Clone, Copy, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A clamped, always-valid page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    page: i64,
    limit: i64,
}

impl PageRequest {
    /// Clamp `page` to `>= 1` and `limit` into `1..=MAX_PAGE_LIMIT`.
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.max(1),
            limit: limit.clamp(1, MAX_PAGE_LIMIT),
        }
    }

    pub fn page(&self) -> i64 {
        self.page
    }

    pub fn limit(&self) -> i64 {
        self.limit
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(1, DEFAULT_PAGE_LIMIT)
    }
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        Self::new(
            params.page.unwrap_or(1),
            params.limit.unwrap_or(DEFAULT_PAGE_LIMIT),
        )
    }
}
