//! Subscription lifecycle and the per-subscription poll check.

use std::sync::Arc;

use log::debug;
use log::info;

use crate::listing::Ad;
use crate::listing::aggregator::ListingAggregator;
use crate::listing::error::ListingError;
use crate::model::SubscriptionModel;
use crate::notifier::Notification;
use crate::service::ad_store::AdStore;
use crate::service::error::ServiceError;
use crate::service::subscription_registry::SubscriptionRegistry;

pub enum SubscribeResult {
    /// Subscription created after every current ad was recorded as shown.
    Success {
        subscription: SubscriptionModel,
        baseline: usize,
    },
    AlreadySubscribed { subscription: SubscriptionModel },
}

/// Service tying listings, the ad store and the registry together.
pub struct ListingWatchService {
    pub aggregator: Arc<ListingAggregator>,
    pub ad_store: Arc<AdStore>,
    pub registry: Arc<SubscriptionRegistry>,
}

impl ListingWatchService {
    pub fn new(
        aggregator: Arc<ListingAggregator>,
        ad_store: Arc<AdStore>,
        registry: Arc<SubscriptionRegistry>,
    ) -> Self {
        Self {
            aggregator,
            ad_store,
            registry,
        }
    }

    /// Subscribes to a search with baseline ingestion.
    ///
    /// Every ad currently matching the search is recorded as shown before the subscription row
    /// is written, so only ads appearing afterwards are ever notified. When the fetch fails
    /// nothing is written.
    ///
    /// # Performance
    /// * DB calls: 3
    pub async fn subscribe(
        &self,
        subscriber_id: &str,
        url: &str,
    ) -> Result<SubscribeResult, ServiceError> {
        let url = url.trim();
        if !self.aggregator.source().is_supported_url(url) {
            return Err(ListingError::UnsupportedUrl {
                url: url.to_string(),
            }
            .into());
        }

        // DB 1
        if let Some(subscription) = self.registry.find(subscriber_id, url).await? {
            return Ok(SubscribeResult::AlreadySubscribed { subscription });
        }

        let ads = self.aggregator.fetch_all(url).await?;
        let identities: Vec<String> = ads.into_iter().map(|ad| ad.identity).collect();

        // DB 2
        self.ad_store.mark_shown(subscriber_id, &identities).await?;

        // DB 3
        let (subscription, created) = self.registry.add(subscriber_id, url).await?;
        if !created {
            return Ok(SubscribeResult::AlreadySubscribed { subscription });
        }
        info!(
            "Baseline of {} ad(s) recorded for subscription {}",
            identities.len(),
            subscription.id
        );
        Ok(SubscribeResult::Success {
            subscription,
            baseline: identities.len(),
        })
    }

    /// Runs one poll check of a subscription.
    ///
    /// Returns the fresh ads the subscriber has not seen yet, already recorded as shown.
    ///
    /// # Performance
    /// * DB calls: 2
    pub async fn check_subscription(
        &self,
        subscription: &SubscriptionModel,
    ) -> Result<Vec<Ad>, ServiceError> {
        let ads = self.aggregator.fetch_all(&subscription.url).await?;
        let total = ads.len();

        // DB 1
        let unseen = self
            .ad_store
            .filter_unseen(&subscription.subscriber_id, ads)
            .await?;
        let fresh = select_fresh(unseen);
        debug!(
            "Subscription {}: {total} ad(s), {} fresh unseen",
            subscription.id,
            fresh.len()
        );

        // DB 2
        let identities: Vec<String> = fresh.iter().map(|ad| ad.identity.clone()).collect();
        self.ad_store
            .mark_shown(&subscription.subscriber_id, &identities)
            .await?;

        Ok(fresh)
    }

    pub fn notification_for(&self, ad: &Ad) -> Notification {
        Notification {
            title: ad.name.clone(),
            price_text: format!("{}€", ad.price),
            image_url: self.aggregator.source().get_image_url(&ad.image),
            link_url: self.aggregator.source().get_ad_url(&ad.identity),
        }
    }
}

/// Keeps the ads posted today or without a posted label.
pub fn select_fresh(ads: Vec<Ad>) -> Vec<Ad> {
    ads.into_iter().filter(Ad::is_fresh).collect()
}
