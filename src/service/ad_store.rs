//! Record of which ads were already shown to which subscriber.

use std::sync::Arc;

use log::debug;

use crate::listing::Ad;
use crate::repository::Repository;
use crate::service::error::ServiceError;

/// Service over the `shown` table.
pub struct AdStore {
    pub db: Arc<Repository>,
}

impl AdStore {
    pub fn new(db: Arc<Repository>) -> Self {
        Self { db }
    }

    /// # Performance
    /// * DB calls: 1
    pub async fn has_been_shown(
        &self,
        subscriber_id: &str,
        identity: &str,
    ) -> Result<bool, ServiceError> {
        Ok(self.db.shown.exists(subscriber_id, identity).await?)
    }

    /// Records `identities` as shown to the subscriber.
    ///
    /// Idempotent, and all-or-nothing for one call. Returns the number of new records.
    ///
    /// # Performance
    /// * DB calls: 1 transaction
    pub async fn mark_shown(
        &self,
        subscriber_id: &str,
        identities: &[String],
    ) -> Result<u64, ServiceError> {
        if identities.is_empty() {
            return Ok(0);
        }
        let inserted = self.db.shown.insert_many(subscriber_id, identities).await?;
        debug!(
            "Marked {inserted} of {} ad(s) as shown to {subscriber_id}",
            identities.len()
        );
        Ok(inserted)
    }

    /// Ads of `ads` not yet shown to the subscriber, order preserved.
    ///
    /// # Performance
    /// * DB calls: 1
    pub async fn filter_unseen(
        &self,
        subscriber_id: &str,
        ads: Vec<Ad>,
    ) -> Result<Vec<Ad>, ServiceError> {
        let shown = self.db.shown.select_ads_by_subscriber_id(subscriber_id).await?;
        Ok(ads
            .into_iter()
            .filter(|ad| !shown.contains(&ad.identity))
            .collect())
    }
}
