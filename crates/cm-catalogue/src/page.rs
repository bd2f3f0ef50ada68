//! Pagination types shared by every paged upstream listing.

use serde::{Deserialize, Serialize};

/// One page of an upstream listing. Page metadata is carried verbatim from
/// the upstream response; result ordering is upstream-defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageResults<T> {
    pub page: u32,
    pub size: u32,
    pub total_results: u64,
    pub results: Vec<T>,
}

impl<T> PageResults<T> {
    pub fn empty() -> Self {
        Self {
            page: 0,
            size: 0,
            total_results: 0,
            results: Vec::new(),
        }
    }
}

/// Page/size pair parsed from request query parameters.
///
/// Non-numeric or absent values fall back to the defaults (page 0, size 10)
/// rather than failing the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub size: u32,
}

impl Pagination {
    pub fn from_query(page: Option<&str>, size: Option<&str>) -> Self {
        Self {
            page: page.and_then(|p| p.parse().ok()).unwrap_or(0),
            size: size.and_then(|s| s.parse().ok()).unwrap_or(10),
        }
    }

    pub fn query_string(&self) -> String {
        format!("page={}&size={}", self.page, self.size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self { page: 0, size: 10 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_to_missing_and_garbage_input() {
        assert_eq!(Pagination::from_query(None, None), Pagination { page: 0, size: 10 });
        assert_eq!(
            Pagination::from_query(Some("x"), Some("-3")),
            Pagination { page: 0, size: 10 }
        );
        assert_eq!(
            Pagination::from_query(Some("2"), Some("25")),
            Pagination { page: 2, size: 25 }
        );
    }

    #[test]
    fn query_string_round_trips() {
        let p = Pagination { page: 3, size: 20 };
        assert_eq!(p.query_string(), "page=3&size=20");
    }
}
