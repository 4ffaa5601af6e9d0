use serde::Serialize;

/// Rows per page on every list screen.
pub const PAGE_SIZE: u64 = 10;

/// A 1-indexed page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub per_page: u64,
}

impl PageRequest {
    /// Pages below 1 are treated as the first page.
    pub fn new(page: u64, per_page: u64) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn page(page: u64) -> Self {
        Self::new(page, PAGE_SIZE)
    }

    /// Zero-based row offset, capped at what SQL backends accept.
    pub fn offset(&self) -> u64 {
        (self.page - 1)
            .saturating_mul(self.per_page)
            .min(i64::MAX as u64)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::page(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PageLink {
    pub url: Option<String>,
    pub label: String,
    pub active: bool,
}

/// Navigation metadata for one page of a listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    /// 1-based position of the first item on this page
    pub from: Option<u64>,
    pub to: Option<u64>,
    pub path: String,
    pub prev_page_url: Option<String>,
    pub next_page_url: Option<String>,
    pub links: Vec<PageLink>,
}

impl Pagination {
    pub fn new(total: u64, request: PageRequest, path: &str) -> Self {
        let PageRequest { page, per_page } = request;
        let last_page = total.div_ceil(per_page).max(1);

        let (from, to) = if total > 0 && page <= last_page {
            let first = request.offset() + 1;
            (Some(first), Some((first + per_page - 1).min(total)))
        } else {
            (None, None)
        };

        let url = |n: u64| format!("{}?page={}", path, n);
        let prev_page_url = (page > 1).then(|| url(page - 1));
        let next_page_url = (page < last_page).then(|| url(page + 1));

        let mut links = Vec::with_capacity(last_page as usize + 2);
        links.push(PageLink {
            url: prev_page_url.clone(),
            label: "« Previous".to_string(),
            active: false,
        });
        links.extend((1..=last_page).map(|n| PageLink {
            url: Some(url(n)),
            label: n.to_string(),
            active: n == page,
        }));
        links.push(PageLink {
            url: next_page_url.clone(),
            label: "Next »".to_string(),
            active: false,
        });

        Self {
            current_page: page,
            last_page,
            per_page,
            total,
            from,
            to,
            path: path.to_string(),
            prev_page_url,
            next_page_url,
            links,
        }
    }
}

/// One page of records plus its navigation metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(flatten)]
    pub meta: Pagination,
}

impl<T> Page<T> {
    pub fn new(data: Vec<T>, meta: Pagination) -> Self {
        Self { data, meta }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            data: self.data.into_iter().map(f).collect(),
            meta: self.meta,
        }
    }
}
