//! Business logic services for listing subscriptions.

use std::sync::Arc;

use crate::listing::aggregator::ListingAggregator;
use crate::repository::Repository;
use crate::service::ad_store::AdStore;
use crate::service::listing_watch_service::ListingWatchService;
use crate::service::subscription_registry::SubscriptionRegistry;

pub mod ad_store;
pub mod error;
pub mod listing_watch_service;
pub mod subscription_registry;

/// Container for all application services.
pub struct Services {
    pub ad_store: Arc<AdStore>,
    pub subscription_registry: Arc<SubscriptionRegistry>,
    pub listing_watch: Arc<ListingWatchService>,
}

impl Services {
    /// Creates and initializes all services.
    pub fn new(db: Arc<Repository>, aggregator: Arc<ListingAggregator>) -> Self {
        let ad_store = Arc::new(AdStore::new(db.clone()));
        let subscription_registry = Arc::new(SubscriptionRegistry::new(db));
        let listing_watch = Arc::new(ListingWatchService::new(
            aggregator,
            ad_store.clone(),
            subscription_registry.clone(),
        ));

        Self {
            ad_store,
            subscription_registry,
            listing_watch,
        }
    }
}
