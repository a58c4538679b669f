//! Page-number pagination for search and history results.
//!
//! Callers ask for a 1-based page and an optional limit. The service resolves
//! the request against its configured defaults into a [`PageWindow`], which
//! carries the `skip`/`limit` pair handed to the store.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A requested page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    /// 1-based page number.
    pub page: u32,

    /// Page size; `None` uses the service default.
    pub limit: Option<u32>,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: None,
        }
    }
}

impl PageRequest {
    /// Creates a request for the given page and limit.
    pub fn new(page: u32, limit: u32) -> Self {
        Self {
            page,
            limit: Some(limit),
        }
    }

    /// Resolves the request into a concrete window.
    ///
    /// A zero page or zero limit is rejected. A limit above `max_limit` is
    /// clamped; the returned window records whether that happened.
    pub fn resolve(&self, default_limit: u32, max_limit: u32) -> Result<PageWindow, ValidationError> {
        if self.page == 0 {
            return Err(ValidationError::InvalidPagination {
                message: "page must be at least 1".to_string(),
            });
        }

        let requested = self.limit.unwrap_or(default_limit);
        if requested == 0 {
            return Err(ValidationError::InvalidPagination {
                message: "limit must be at least 1".to_string(),
            });
        }

        let limit = requested.min(max_limit);
        Ok(PageWindow {
            page: self.page,
            limit,
            clamped: limit != requested,
        })
    }
}

/// A validated page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// 1-based page number.
    pub page: u32,
    /// Effective page size.
    pub limit: u32,
    /// True when the requested limit exceeded the maximum.
    pub clamped: bool,
}

impl PageWindow {
    /// Number of matching records to skip before this page.
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

/// One page of search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPage<T> {
    /// Records on this page, in insertion order.
    pub records: Vec<T>,

    /// Number of records matching the filter before pagination.
    pub total_count: u64,

    /// `ceil(total_count / limit)`.
    pub total_pages: u64,

    /// The page that was returned.
    pub page: u32,

    /// The effective page size.
    pub limit: u32,
}

impl<T> SearchPage<T> {
    /// Builds a page; `total_pages` is derived from `total_count`.
    pub fn new(records: Vec<T>, total_count: u64, window: PageWindow) -> Self {
        Self {
            records,
            total_count,
            total_pages: total_count.div_ceil(u64::from(window.limit)),
            page: window.page,
            limit: window.limit,
        }
    }

    /// Returns true if a later page exists.
    pub fn has_next(&self) -> bool {
        u64::from(self.page) < self.total_pages
    }

    /// Returns true if no records matched.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_request_uses_default_limit() {
        let window = PageRequest::default().resolve(10, 100).unwrap();
        assert_eq!(window.page, 1);
        assert_eq!(window.limit, 10);
        assert_eq!(window.skip(), 0);
        assert!(!window.clamped);
    }

    #[test]
    fn test_skip() {
        let window = PageRequest::new(3, 25).resolve(10, 100).unwrap();
        assert_eq!(window.skip(), 50);
    }

    #[test]
    fn test_zero_page_rejected() {
        let err = PageRequest::new(0, 10).resolve(10, 100).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPagination { .. }));
    }

    #[test]
    fn test_zero_limit_rejected() {
        let err = PageRequest::new(1, 0).resolve(10, 100).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidPagination { .. }));
    }

    #[test]
    fn test_limit_clamped() {
        let window = PageRequest::new(1, 500).resolve(10, 100).unwrap();
        assert_eq!(window.limit, 100);
        assert!(window.clamped);
    }

    #[test]
    fn test_total_pages_from_total_count() {
        let window = PageRequest::new(2, 10).resolve(10, 100).unwrap();
        let page = SearchPage::new(vec![(); 5], 25, window);
        assert_eq!(page.total_pages, 3);
        assert!(page.has_next());

        let empty: SearchPage<()> = SearchPage::new(vec![], 0, window);
        assert_eq!(empty.total_pages, 0);
        assert!(empty.is_empty());
        assert!(!empty.has_next());
    }
}
