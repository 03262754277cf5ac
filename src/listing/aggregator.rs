//! Full result set of a search across all of its pages.

use std::collections::HashSet;
use std::sync::Arc;

use futures::StreamExt;
use futures::TryStreamExt;
use futures::stream;
use log::debug;

use crate::listing::Ad;
use crate::listing::ListingSource;
use crate::listing::error::ListingError;

/// Drives a [`ListingSource`] across every page of a search.
pub struct ListingAggregator {
    source: Arc<dyn ListingSource>,
    max_concurrency: usize,
}

impl ListingAggregator {
    /// `max_concurrency` bounds the number of pages in flight at once.
    pub fn new(source: Arc<dyn ListingSource>, max_concurrency: usize) -> Self {
        Self {
            source,
            max_concurrency: max_concurrency.max(1),
        }
    }

    pub fn source(&self) -> &Arc<dyn ListingSource> {
        &self.source
    }

    /// Fetches every page of the search behind `url` and returns its ads deduplicated by
    /// identity, first-seen first.
    ///
    /// Pages are fetched concurrently but merged in ascending page order. Any failing page fails
    /// the whole call.
    pub async fn fetch_all(&self, url: &str) -> Result<Vec<Ad>, ListingError> {
        let query = self.source.fetch_query(url).await?;

        let pages: Vec<Vec<Ad>> = stream::iter(1..=query.page_count)
            .map(|page| self.source.fetch_page(&query, page))
            .buffered(self.max_concurrency)
            .try_collect()
            .await?;

        let ads = dedup_by_identity(pages.into_iter().flatten());
        debug!(
            "Fetched {} unique ad(s) over {} page(s) for {url}",
            ads.len(),
            query.page_count
        );
        Ok(ads)
    }
}

/// Keeps the first ad of every identity, preserving order.
pub fn dedup_by_identity(ads: impl IntoIterator<Item = Ad>) -> Vec<Ad> {
    let mut seen = HashSet::new();
    ads.into_iter()
        .filter(|ad| seen.insert(ad.identity.clone()))
        .collect()
}
