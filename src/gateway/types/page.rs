//! Pagination query and response envelope

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// `?page=&size=` query parameters
#[derive(Debug, Clone, Copy, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    /// 1-based page number (default 1)
    pub page: Option<i64>,
    /// Page size, 1..=100 (default 10)
    pub size: Option<i64>,
}

/// Normalized page window, always valid for LIMIT/OFFSET
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: i64,
    pub size: i64,
}

impl PageWindow {
    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.size
    }

    pub fn limit(&self) -> i64 {
        self.size
    }
}

impl PageQuery {
    /// Clamp to `page >= 1` and `1 <= size <= MAX_PAGE_SIZE`
    pub fn window(&self) -> PageWindow {
        let page = self.page.filter(|p| *p >= 1).unwrap_or(1);
        let size = match self.size {
            Some(s) if s >= 1 => s.min(MAX_PAGE_SIZE),
            _ => DEFAULT_PAGE_SIZE,
        };
        PageWindow { page, size }
    }
}

/// Paginated listing
#[derive(Debug, Serialize, ToSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    #[schema(example = 42)]
    pub total_count: i64,
    #[schema(example = 1)]
    pub page: i64,
    #[schema(example = 10)]
    pub size: i64,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total_count: i64, window: PageWindow) -> Self {
        Self {
            items,
            total_count,
            page: window.page,
            size: window.size,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total_count: self.total_count,
            page: self.page,
            size: self.size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let w = PageQuery::default().window();
        assert_eq!(w, PageWindow { page: 1, size: 10 });
        assert_eq!(w.offset(), 0);
    }

    #[test]
    fn test_clamps_bad_values() {
        let w = PageQuery {
            page: Some(0),
            size: Some(1000),
        }
        .window();
        assert_eq!(w.page, 1);
        assert_eq!(w.size, MAX_PAGE_SIZE);

        let w = PageQuery {
            page: Some(-3),
            size: Some(0),
        }
        .window();
        assert_eq!(w, PageWindow { page: 1, size: DEFAULT_PAGE_SIZE });
    }

    #[test]
    fn test_offset() {
        let w = PageQuery {
            page: Some(3),
            size: Some(20),
        }
        .window();
        assert_eq!(w.offset(), 40);
        assert_eq!(w.limit(), 20);
    }
}
