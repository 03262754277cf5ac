//! Saved searches of subscribers.

use std::sync::Arc;

use log::info;

use crate::model::SubscriptionModel;
use crate::repository::Repository;
use crate::repository::table::Table;
use crate::service::error::ServiceError;

/// Service over the `subscriptions` table.
pub struct SubscriptionRegistry {
    pub db: Arc<Repository>,
}

impl SubscriptionRegistry {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// Adds the search unless the subscriber already watches it.
    ///
    /// Returns the stored row and whether it was created by this call.
    pub async fn add(
        &self,
        subscriber_id: &str,
        url: &str,
    ) -> Result<(SubscriptionModel, bool), ServiceError> {
        let (subscription, created) = self
            .db
            .subscription
            .insert_or_ignore(subscriber_id, url)
            .await?;
        if created {
            info!(
                "Added subscription {} of {subscriber_id} to {url}",
                subscription.id
            );
        }
        Ok((subscription, created))
    }

    /// Subscriptions of a subscriber, oldest first.
    pub async fn list_for(
        &self,
        subscriber_id: &str,
    ) -> Result<Vec<SubscriptionModel>, ServiceError> {
        Ok(self
            .db
            .subscription
            .select_all_by_subscriber_id(subscriber_id)
            .await?)
    }

    /// Returns `true` when the subscription existed.
    pub async fn remove(&self, subscription_id: i32) -> Result<bool, ServiceError> {
        let removed = self.db.subscription.delete(&subscription_id).await?;
        if removed {
            info!("Removed subscription {subscription_id}");
        }
        Ok(removed)
    }

    pub async fn list_all(&self) -> Result<Vec<SubscriptionModel>, ServiceError> {
        Ok(self.db.subscription.select_all().await?)
    }

    pub async fn get(
        &self,
        subscription_id: i32,
    ) -> Result<Option<SubscriptionModel>, ServiceError> {
        Ok(self.db.subscription.select(&subscription_id).await?)
    }

    pub async fn find(
        &self,
        subscriber_id: &str,
        url: &str,
    ) -> Result<Option<SubscriptionModel>, ServiceError> {
        Ok(self
            .db
            .subscription
            .select_by_subscriber_and_url(subscriber_id, url)
            .await?)
    }
}
