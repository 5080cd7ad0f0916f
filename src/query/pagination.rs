//! Page-number pagination
//!
//! `page` is 1-based and `paginate` is the page size. Zero or missing values
//! fall back to the defaults. There is no upper bound on the page size.

/// Page size used when `paginate` is missing or zero
pub const DEFAULT_PAGE_SIZE: i64 = 25;

/// Page used when `page` is missing or zero
pub const DEFAULT_PAGE: i64 = 1;

/// Resolved limit/offset pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

impl Pagination {
    pub fn from_args(page: Option<i64>, paginate: Option<i64>) -> Self {
        let page = page.filter(|p| *p != 0).unwrap_or(DEFAULT_PAGE);
        let paginate = paginate.filter(|p| *p != 0).unwrap_or(DEFAULT_PAGE_SIZE);
        Self {
            limit: paginate,
            offset: paginate.saturating_mul(page.saturating_sub(1)),
        }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::from_args(None, None)
    }
}
