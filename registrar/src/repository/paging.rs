//! Offset pagination over composed queries
//!
//! [`paginate`] issues two round trips: a `COUNT` over the query's filters,
//! then the ordered slice `OFFSET (page-1)*size LIMIT size`. Requests are
//! clamped rather than rejected, and a page past the end is an empty page
//! with correct metadata, never an error.
//!
//! Stable pages need a total order on the query. An unordered query is
//! still paginated, with a warning in the log.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::entity::Entity;
use super::query::{Query, Window};
use super::traits::{RepositoryResult, Store};

/// Page number used when the request does not name one
pub const DEFAULT_PAGE_NUMBER: u32 = 1;

/// Page-size limits, loaded from the `[paging]` configuration section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagingConfig {
    /// Page size used when the request does not name one
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,

    /// Upper bound for any requested page size
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            default_page_size: default_page_size(),
            max_page_size: default_max_page_size(),
        }
    }
}

fn default_page_size() -> u32 {
    10
}

fn default_max_page_size() -> u32 {
    100
}

/// Page request as received from a caller, before clamping.
///
/// Deserializes from `?pageNumber=2&pageSize=25`. Values are signed so that
/// zero and negative inputs clamp instead of failing extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
}

impl PageRequest {
    pub fn new(page_number: Option<i64>, page_size: Option<i64>) -> Self {
        Self {
            page_number,
            page_size,
        }
    }

    /// Apply defaults and clamp into a valid [`PageWindow`].
    ///
    /// `page_number < 1` becomes 1; `page_size` is clamped to
    /// `[1, max_page_size]`.
    pub fn normalize(&self, config: &PagingConfig) -> PageWindow {
        let max_size = config.max_page_size.max(1);
        let default_size = config.default_page_size.clamp(1, max_size);

        let page_number = self
            .page_number
            .map_or(DEFAULT_PAGE_NUMBER, |n| clamp_to_u32(n, 1, u32::MAX));
        let page_size = self
            .page_size
            .map_or(default_size, |n| clamp_to_u32(n, 1, max_size));

        PageWindow {
            page_number,
            page_size,
        }
    }
}

fn clamp_to_u32(value: i64, min: u32, max: u32) -> u32 {
    let clamped = value.clamp(i64::from(min), i64::from(max));
    u32::try_from(clamped).unwrap_or(max)
}

/// A validated page position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page_number: u32,
    pub page_size: u32,
}

impl PageWindow {
    /// Rows to skip before this page
    pub fn offset(&self) -> u64 {
        u64::from(self.page_number.saturating_sub(1)) * u64::from(self.page_size)
    }

    pub(crate) fn window(&self) -> Window {
        Window::new(self.offset(), u64::from(self.page_size))
    }
}

/// One page of results plus navigation metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    pub page_number: u32,
    pub page_size: u32,
    pub total_count: u64,
    pub total_pages: u64,
}

impl<T> PagedResult<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_count: u64) -> Self {
        Self {
            items,
            page_number: window.page_number,
            page_size: window.page_size,
            total_count,
            total_pages: total_pages(total_count, window.page_size),
        }
    }

    pub fn has_next(&self) -> bool {
        u64::from(self.page_number) < self.total_pages
    }

    pub fn has_previous(&self) -> bool {
        self.page_number > 1
    }

    /// Transform the items, keeping the metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PagedResult<U> {
        PagedResult {
            items: self.items.into_iter().map(f).collect(),
            page_number: self.page_number,
            page_size: self.page_size,
            total_count: self.total_count,
            total_pages: self.total_pages,
        }
    }
}

/// `ceil(total_count / page_size)`; 0 when there are no rows.
pub fn total_pages(total_count: u64, page_size: u32) -> u64 {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(u64::from(page_size))
}

/// Count, then fetch the requested slice of `query`.
pub async fn paginate<S, E, P>(
    query: &Query<'_, S, E, P>,
    request: PageRequest,
    config: &PagingConfig,
    cancel: &CancellationToken,
) -> RepositoryResult<PagedResult<P>>
where
    S: Store,
    E: Entity,
    P: 'static,
{
    if !query.is_ordered() {
        tracing::warn!(
            entity = E::NAME,
            "paginating an unordered query; page contents may be unstable"
        );
    }

    let window = request.normalize(config);
    let total_count = query.count(cancel).await?;

    let items = query.windowed(window.window()).materialize(cancel).await?;

    tracing::debug!(
        entity = E::NAME,
        page_number = window.page_number,
        page_size = window.page_size,
        total_count,
        returned = items.len(),
        "page fetched"
    );

    Ok(PagedResult::new(items, window, total_count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> PagingConfig {
        PagingConfig::default()
    }

    #[test]
    fn test_defaults() {
        let window = PageRequest::default().normalize(&config());
        assert_eq!(window.page_number, 1);
        assert_eq!(window.page_size, 10);
        assert_eq!(window.offset(), 0);
    }

    #[test]
    fn test_page_number_clamps_to_one() {
        for n in [0, -1, -500] {
            let window = PageRequest::new(Some(n), None).normalize(&config());
            assert_eq!(window.page_number, 1, "page number {n}");
        }
    }

    #[test]
    fn test_page_size_clamps_into_range() {
        let cfg = config();
        assert_eq!(PageRequest::new(None, Some(0)).normalize(&cfg).page_size, 1);
        assert_eq!(PageRequest::new(None, Some(-3)).normalize(&cfg).page_size, 1);
        assert_eq!(PageRequest::new(None, Some(250)).normalize(&cfg).page_size, 100);
        assert_eq!(PageRequest::new(None, Some(25)).normalize(&cfg).page_size, 25);
    }

    #[test]
    fn test_misconfigured_default_is_clamped() {
        let cfg = PagingConfig {
            default_page_size: 500,
            max_page_size: 50,
        };
        assert_eq!(PageRequest::default().normalize(&cfg).page_size, 50);
    }

    #[test]
    fn test_offset() {
        let window = PageRequest::new(Some(3), Some(10)).normalize(&config());
        assert_eq!(window.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
        assert_eq!(total_pages(25, 10), 3);
    }

    #[test]
    fn test_paged_result_serializes_camel_case() {
        let window = PageRequest::new(Some(1), Some(10)).normalize(&config());
        let page = PagedResult::new(vec![1, 2, 3], window, 3);
        let json = serde_json::to_value(&page).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "items": [1, 2, 3],
                "pageNumber": 1,
                "pageSize": 10,
                "totalCount": 3,
                "totalPages": 1
            })
        );
    }

    #[test]
    fn test_page_request_from_query_string_names() {
        let request: PageRequest =
            serde_json::from_value(serde_json::json!({"pageNumber": 4, "pageSize": -2})).unwrap();
        assert_eq!(request, PageRequest::new(Some(4), Some(-2)));
    }

    #[test]
    fn test_navigation_flags() {
        let window = PageRequest::new(Some(2), Some(10)).normalize(&config());
        let page: PagedResult<u8> = PagedResult::new(vec![], window, 25);
        assert!(page.has_next());
        assert!(page.has_previous());

        let window = PageRequest::new(Some(3), Some(10)).normalize(&config());
        let page: PagedResult<u8> = PagedResult::new(vec![], window, 25);
        assert!(!page.has_next());
    }
}
