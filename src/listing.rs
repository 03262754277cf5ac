//! Listings site integration.
//!
//! A saved search is a search-result URL of the listings site. [`query`] turns it into the
//! parameters of the paginated listings endpoint, [`parser`] extracts [`Ad`] records from one
//! results page, and [`aggregator`] drives both across every page of a search.

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::listing::error::ListingError;

pub mod aggregator;
pub mod bazaraki_platform;
pub mod error;
pub mod parser;
pub mod query;

/// Posted label substring that marks an ad as posted today.
pub const FRESH_MARKER: &str = "Today";

/// One classified ad as shown on a results page.
///
/// Two ads with equal `identity` are the same ad regardless of the other fields.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Ad {
    /// Site-relative path of the ad page, e.g. `/adv/12345_iphone/`.
    pub identity: String,
    pub name: String,
    /// Decimal string exactly as the site publishes it.
    pub price: String,
    /// Image URL, empty when the ad has none.
    pub image: String,
    /// Human-readable posting date, e.g. `Today 12:30` or `12 Mar`. Empty when absent.
    pub posted_label: String,
}

impl Ad {
    /// An ad is fresh when its posted label is empty or mentions today.
    ///
    /// The label is matched as an opaque string and never parsed into a date.
    pub fn is_fresh(&self) -> bool {
        self.posted_label.is_empty() || self.posted_label.contains(FRESH_MARKER)
    }
}

/// Static information about a listings site.
#[derive(Clone, Debug)]
pub struct SiteInfo {
    pub name: String,
    /// Registrable domain the site serves search pages from, e.g. `bazaraki.com`.
    pub domain: String,
    /// Scheme and host prefixed to ad identities, e.g. `https://www.bazaraki.com`.
    pub base_url: String,
}

/// Hidden category fields of a search page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Category {
    pub rubric: String,
    pub c: String,
}

/// A search URL decomposed into listings endpoint parameters.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub category: Category,
    /// Number of result pages, at least 1.
    pub page_count: u32,
    /// Query-string pairs of the search URL, in order.
    pub filters: Vec<(String, String)>,
    /// `attrs_<key>` pairs taken from `key---value` path segments, in path order.
    pub attrs: Vec<(String, String)>,
}

impl SearchQuery {
    /// Request parameters for one page.
    ///
    /// Later keys replace earlier keys of the same name, keeping the position of the first.
    /// The page number always wins over a `page` carried in the filters or attrs.
    pub fn page_params(&self, page: u32) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();
        let base = [
            ("rubric", self.category.rubric.clone()),
            ("c", self.category.c.clone()),
            ("page", page.to_string()),
            ("ordering", String::new()),
            ("q", String::new()),
        ];
        for (key, value) in base {
            upsert(&mut params, key, value);
        }
        for (key, value) in self.filters.iter().chain(self.attrs.iter()) {
            upsert(&mut params, key, value.clone());
        }
        upsert(&mut params, "page", page.to_string());
        params
    }
}

fn upsert(params: &mut Vec<(String, String)>, key: &str, value: String) {
    match params.iter_mut().find(|(k, _)| k == key) {
        Some(entry) => entry.1 = value,
        None => params.push((key.to_string(), value)),
    }
}

/// A source of paginated search results.
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Fetches the search page behind `url` and decomposes it into a [`SearchQuery`].
    async fn fetch_query(&self, url: &str) -> Result<SearchQuery, ListingError>;

    /// Fetches and parses a single results page (1-based).
    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<Ad>, ListingError>;

    fn get_info(&self) -> &SiteInfo;

    /// Whether `url` is a search URL this source can watch.
    fn is_supported_url(&self, url: &str) -> bool {
        query::parse_search_url(url, &self.get_info().domain).is_ok()
    }

    /// Absolute URL of the ad page.
    fn get_ad_url(&self, identity: &str) -> String {
        format!(
            "{}{}",
            self.get_info().base_url.trim_end_matches('/'),
            identity
        )
    }

    /// Absolute URL of an ad image, resolving site-relative paths against the base URL.
    fn get_image_url(&self, image: &str) -> String {
        if image.is_empty() {
            return String::new();
        }
        Url::parse(&self.get_info().base_url)
            .and_then(|base| base.join(image))
            .map(String::from)
            .unwrap_or_else(|_| image.to_string())
    }
}
