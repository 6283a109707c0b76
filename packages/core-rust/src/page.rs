//! Pagination envelope shared by all list responses.

use serde::{Deserialize, Serialize};

use crate::resource::HRef;

/// Default page size when the client does not ask for one.
pub const DEFAULT_PAGE_LIMIT: usize = 50;

/// Upper bound on the page size a client may request.
pub const MAX_PAGE_LIMIT: usize = 500;

/// Generic pagination schema flattened into every list response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Link to the first page.
    pub first: HRef,
    /// Link to the next page, absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next: Option<HRef>,
    /// Page size used for this response.
    pub limit: usize,
    /// Number of items matching the query across all pages.
    pub total_count: usize,
}

impl Page {
    /// Builds the page links for a listing at `href`.
    ///
    /// `href` may already carry a query string (e.g. filters); the paging
    /// parameters are appended to it.
    #[must_use]
    pub fn new(href: &str, limit: usize, offset: usize, total_count: usize) -> Self {
        let next = (offset.saturating_add(limit) < total_count).then(|| HRef {
            href: page_link(href, limit, offset + limit),
        });
        Self {
            first: HRef {
                href: page_link(href, limit, 0),
            },
            next,
            limit,
            total_count,
        }
    }
}

/// Clamps a client-supplied limit into `1..=MAX_PAGE_LIMIT`.
#[must_use]
pub fn clamp_limit(limit: Option<usize>) -> usize {
    limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT)
}

fn page_link(href: &str, limit: usize, offset: usize) -> String {
    let sep = if href.contains('?') { '&' } else { '?' };
    format!("{href}{sep}limit={limit}&offset={offset}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_page_has_no_next() {
        let page = Page::new("http://h/api/v1/evaluations/jobs", 50, 0, 3);
        assert_eq!(
            page.first.href,
            "http://h/api/v1/evaluations/jobs?limit=50&offset=0"
        );
        assert!(page.next.is_none());
        assert_eq!(page.total_count, 3);
    }

    #[test]
    fn next_link_advances_offset() {
        let page = Page::new("http://h/jobs", 2, 2, 5);
        assert_eq!(page.next.unwrap().href, "http://h/jobs?limit=2&offset=4");
    }

    #[test]
    fn existing_query_is_preserved() {
        let page = Page::new("http://h/jobs?status=running", 10, 0, 30);
        assert_eq!(
            page.first.href,
            "http://h/jobs?status=running&limit=10&offset=0"
        );
        assert_eq!(
            page.next.unwrap().href,
            "http://h/jobs?status=running&limit=10&offset=10"
        );
    }

    #[test]
    fn next_is_omitted_from_json_on_last_page() {
        let json = serde_json::to_value(Page::new("/x", 10, 0, 1)).unwrap();
        assert!(json.get("next").is_none());
    }

    #[test]
    fn clamp_limit_bounds() {
        assert_eq!(clamp_limit(None), DEFAULT_PAGE_LIMIT);
        assert_eq!(clamp_limit(Some(0)), 1);
        assert_eq!(clamp_limit(Some(10_000)), MAX_PAGE_LIMIT);
        assert_eq!(clamp_limit(Some(20)), 20);
    }
}
