//! `?page=N` handling shared by the listing and search endpoints.

use serde::Deserialize;

use super::deserializers::deserialize_lenient_i64;

/// Questions returned per page. The frontend renders the same page size.
pub const QUESTIONS_PER_PAGE: i64 = 10;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    #[serde(default, deserialize_with = "deserialize_lenient_i64")]
    pub page: Option<i64>,
}

/// A 1-based page of [`QUESTIONS_PER_PAGE`] items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page(i64);

impl Page {
    /// `None` for page numbers below 1, which can never hold items.
    pub fn offset(&self) -> Option<i64> {
        if self.0 < 1 {
            return None;
        }
        (self.0 - 1).checked_mul(QUESTIONS_PER_PAGE)
    }

    pub fn limit(&self) -> i64 {
        QUESTIONS_PER_PAGE
    }
}

impl From<PageQuery> for Page {
    fn from(query: PageQuery) -> Self {
        Page(query.page.unwrap_or(1))
    }
}
