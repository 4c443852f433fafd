// ABOUTME: Static paginator over a {page} URL template with inclusive bounds.
// ABOUTME: Also builds paginators by scraping current/last page markers out of live markup.

//! Pagination.
//!
//! [`StaticPaginator`] walks a fixed, known page range by substituting page
//! numbers into a URL template containing the `{page}` placeholder. Every
//! mutation is bounds-checked against the inclusive `[min_page, last_page]`
//! range and leaves the tracked position untouched on failure.
//!
//! [`StaticPaginator::create_with_tracking`] bootstraps the range from a live
//! document: it fetches the page, reads the current and last page markers
//! with scalar extraction, and seeds the paginator from what it found.

use std::sync::Arc;

use crate::error::{PluckError, Result};
use crate::extract::Extractor;
use crate::http::{Client, RequestOptions, Response};
use crate::parser::{HtmlParser, ParseFirstOptions};

/// Marker the template must contain; every occurrence is substituted.
const PAGE_PLACEHOLDER: &str = "{page}";

/// Bounds and template for a [`StaticPaginator`].
#[derive(Debug, Clone)]
pub struct PaginatorOptions {
    pub initial_page: u32,
    pub last_page: u32,
    /// Lower bound of the range; defaults to `initial_page`.
    pub min_page: Option<u32>,
    pub template_url: String,
}

/// A pagination cursor over a fixed page range.
#[derive(Debug, Clone)]
pub struct StaticPaginator {
    current_page: u32,
    min_page: u32,
    last_page: u32,
    template_url: String,
}

impl StaticPaginator {
    pub fn new(options: PaginatorOptions) -> Self {
        Self {
            current_page: options.initial_page,
            min_page: options.min_page.unwrap_or(options.initial_page),
            last_page: options.last_page,
            template_url: options.template_url,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn min_page(&self) -> u32 {
        self.min_page
    }

    pub fn last_page(&self) -> u32 {
        self.last_page
    }

    pub fn template_url(&self) -> &str {
        &self.template_url
    }

    /// The URL for the current page.
    pub fn current(&self) -> Result<String> {
        Self::generate_url(&self.template_url, self.current_page)
    }

    /// Substitutes a page number into a template. A template without the
    /// `{page}` placeholder is rejected.
    pub fn generate_url(template_url: &str, page: u32) -> Result<String> {
        if !template_url.contains(PAGE_PLACEHOLDER) {
            return Err(PluckError::InvalidUrl(template_url.to_string()));
        }
        Ok(template_url.replace(PAGE_PLACEHOLDER, &page.to_string()))
    }

    /// Moves the cursor to an absolute page and returns its URL. The cursor
    /// is unchanged when the page falls outside the range.
    pub fn set(&mut self, page: u32) -> Result<String> {
        if page < self.min_page || page > self.last_page {
            return Err(PluckError::PageOutOfRange {
                page,
                min: self.min_page,
                max: self.last_page,
            });
        }
        let url = Self::generate_url(&self.template_url, page)?;
        self.current_page = page;
        Ok(url)
    }

    /// Advances the cursor one page. Fails without wrapping at the end of
    /// the range.
    pub fn next(&mut self) -> Result<String> {
        self.set(self.current_page + 1)
    }

    /// Moves the cursor back one page. Fails without wrapping at the start
    /// of the range.
    pub fn previous(&mut self) -> Result<String> {
        if self.current_page == 0 {
            return Err(PluckError::PageOutOfRange {
                page: 0,
                min: self.min_page,
                max: self.last_page,
            });
        }
        self.set(self.current_page - 1)
    }

    /// Enumerates URLs from the current page forward in ascending order,
    /// without moving the cursor. A limit caps how many pages are produced;
    /// the range end is never exceeded.
    pub fn dump(&self, limit: Option<usize>) -> Result<Vec<String>> {
        let end = match limit {
            Some(limit) => {
                let limit = u32::try_from(limit).unwrap_or(u32::MAX);
                self.last_page
                    .min(self.current_page.saturating_add(limit).saturating_sub(1))
            }
            None => self.last_page,
        };

        let mut urls = Vec::new();
        let mut page = self.current_page;
        while page <= end {
            urls.push(Self::generate_url(&self.template_url, page)?);
            page += 1;
        }
        Ok(urls)
    }

    /// Fetches a live page and seeds a paginator from its pagination
    /// markers. The fetched response and its bound parser are returned
    /// alongside the paginator so the first page needs no second request.
    pub async fn create_with_tracking(
        client: &Client,
        request: &RequestOptions,
        template_url: &str,
        trackers: &Trackers,
    ) -> Result<TrackedPagination> {
        let response = client.fetch(request).await?;
        let parser = response.html_parser();

        let current_page = resolve_tracker(&parser, &trackers.current_page, "current page").await?;
        let last_page = resolve_tracker(&parser, &trackers.last_page, "last page").await?;

        // The tracked page becomes the floor of the range: pages before the
        // one the fetch landed on are out of bounds.
        let paginator = StaticPaginator::new(PaginatorOptions {
            initial_page: current_page,
            last_page,
            min_page: None,
            template_url: template_url.to_string(),
        });

        Ok(TrackedPagination {
            response,
            parser,
            paginator,
        })
    }
}

/// Converts a tracker's raw extracted text into a page number.
pub type TrackerTransformer = Arc<dyn Fn(&str) -> Option<u32> + Send + Sync>;

/// Locates one pagination marker in the fetched document.
pub struct Tracker {
    pub query: String,
    pub extractor: Extractor,
    /// Overrides the default trim-and-parse conversion of the raw text.
    pub transformer: Option<TrackerTransformer>,
}

impl Tracker {
    pub fn new(query: impl Into<String>, extractor: Extractor) -> Self {
        Self {
            query: query.into(),
            extractor,
            transformer: None,
        }
    }

    pub fn transformer(mut self, transformer: TrackerTransformer) -> Self {
        self.transformer = Some(transformer);
        self
    }
}

/// The pair of markers needed to seed a page range.
pub struct Trackers {
    pub current_page: Tracker,
    pub last_page: Tracker,
}

/// The result of a tracked bootstrap: the paginator plus the already-fetched
/// first page.
#[derive(Debug)]
pub struct TrackedPagination {
    pub response: Response,
    pub parser: HtmlParser,
    pub paginator: StaticPaginator,
}

async fn resolve_tracker(
    parser: &HtmlParser,
    tracker: &Tracker,
    name: &'static str,
) -> Result<u32> {
    let raw = parser
        .parse_first(&ParseFirstOptions {
            query: Some(tracker.query.clone()),
            extractor: Arc::clone(&tracker.extractor),
            default: None,
        })
        .await?;

    let raw = match raw {
        serde_json::Value::String(s) => s,
        _ => return Err(PluckError::PageParsingFailure(name)),
    };

    let page = match &tracker.transformer {
        Some(transformer) => transformer(&raw),
        None => raw.trim().parse::<u32>().ok(),
    };

    page.ok_or_else(|| PluckError::InvalidPageValue {
        tracker: name,
        value: raw,
    })
}
