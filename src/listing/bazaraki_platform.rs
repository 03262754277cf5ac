//! Bazaraki classifieds integration.

use std::num::NonZeroU32;

use async_trait::async_trait;
use governor::Quota;
use governor::RateLimiter;
use governor::clock::QuantaClock;
use governor::state::InMemoryState;
use governor::state::direct::NotKeyed;
use log::debug;
use log::info;
use url::Url;

use crate::listing::Ad;
use crate::listing::ListingSource;
use crate::listing::SearchQuery;
use crate::listing::SiteInfo;
use crate::listing::error::ListingError;
use crate::listing::parser;
use crate::listing::query;

const LISTING_PATH: &str = "/ajax-items-list/";
const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/137.0.0.0 Safari/537.36";

/// Bazaraki search pages and the paginated `ajax-items-list` endpoint.
pub struct BazarakiPlatform {
    info: SiteInfo,
    client: reqwest::Client,
    limiter: RateLimiter<NotKeyed, InMemoryState, QuantaClock>,
    strict: bool,
}

impl BazarakiPlatform {
    /// Creates a new platform for `base_url`, allowing `requests_per_second` outbound requests.
    pub fn new(base_url: &str, requests_per_second: u32) -> Result<Self, ListingError> {
        let base = Url::parse(base_url).map_err(|_| ListingError::UnsupportedUrl {
            url: base_url.to_string(),
        })?;
        let domain = base
            .host_str()
            .ok_or_else(|| ListingError::UnsupportedUrl {
                url: base_url.to_string(),
            })?
            .trim_start_matches("www.")
            .to_string();

        let info = SiteInfo {
            name: "Bazaraki".to_string(),
            domain,
            base_url: base_url.trim_end_matches('/').to_string(),
        };

        let rps = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let limiter = RateLimiter::direct(Quota::per_second(rps));
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;

        Ok(Self {
            info,
            client,
            limiter,
            strict: false,
        })
    }

    /// Fail a whole page on the first malformed ad node instead of skipping it.
    pub fn with_strict_parsing(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<String, ListingError> {
        if self.limiter.check().is_err() {
            info!("Source {} is ratelimited. Waiting...", self.info.name);
            self.limiter.until_ready().await;
        }

        let req = request.build()?;
        let url = req.url().to_string();
        debug!("Making request to: {url}");

        let response = self.client.execute(req).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ListingError::UnexpectedStatus {
                status: status.as_u16(),
                url,
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl ListingSource for BazarakiPlatform {
    async fn fetch_query(&self, url: &str) -> Result<SearchQuery, ListingError> {
        debug!("Decomposing search URL {url}");
        let parsed = query::parse_search_url(url, &self.info.domain)?;

        let body = self.send(self.client.get(parsed.as_str())).await?;
        let search = query::decompose(&parsed, &body)?;
        debug!(
            "Search {url} has {} page(s), {} filter(s), {} attr(s)",
            search.page_count,
            search.filters.len(),
            search.attrs.len()
        );
        Ok(search)
    }

    async fn fetch_page(&self, query: &SearchQuery, page: u32) -> Result<Vec<Ad>, ListingError> {
        let request = self
            .client
            .get(format!("{}{LISTING_PATH}", self.info.base_url))
            .header("x-requested-with", "XMLHttpRequest")
            .query(&query.page_params(page));

        let body = self.send(request).await?;
        let listing = parser::parse_envelope(&body)?;
        let ads = parser::parse_listing(&listing, self.strict)?;
        debug!("Parsed {} ad(s) from page {page}", ads.len());
        Ok(ads)
    }

    fn get_info(&self) -> &SiteInfo {
        &self.info
    }
}
