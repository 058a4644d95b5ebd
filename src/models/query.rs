use serde::{Deserialize, Serialize};

pub const POSTS_PER_PAGE: i64 = 6;

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    /// 1-based page number. Anything unparsable or below 1 means page 1.
    pub fn page(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .filter(|p| *p >= 1)
            .unwrap_or(1)
    }
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: i64,
    #[serde(rename = "pageSize")]
    pub page_size: i64,
    #[serde(rename = "totalCount")]
    pub total_count: i64,
    #[serde(rename = "hasNextPage")]
    pub has_next_page: bool,
    #[serde(rename = "hasPrevPage")]
    pub has_prev_page: bool,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, page: i64, page_size: i64, total_count: i64) -> Self {
        Self {
            items,
            page,
            page_size,
            total_count,
            has_next_page: page.saturating_mul(page_size) < total_count,
            has_prev_page: page > 1,
        }
    }

    /// Rows to skip to reach `page`.
    pub fn offset(page: i64, page_size: i64) -> i64 {
        (page.max(1) - 1).saturating_mul(page_size)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
            has_next_page: self.has_next_page,
            has_prev_page: self.has_prev_page,
        }
    }
}
