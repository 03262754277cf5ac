//! Background task polling every subscription for new ads.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use futures::StreamExt;
use futures::stream;
use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::model::SubscriptionModel;
use crate::notifier::Notifier;
use crate::service::listing_watch_service::ListingWatchService;
use crate::service::subscription_registry::SubscriptionRegistry;

type InFlightKey = (String, String);

/// Result of checking one subscription during a cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionOutcome {
    /// The check completed and `count` notifications were handed to the notifier.
    Notified { count: usize },
    /// A check of the same subscription from an earlier cycle is still running.
    InFlight,
    /// Fetching or bookkeeping failed; retried next cycle.
    Failed { error: String },
}

#[derive(Debug, Default)]
pub struct CycleReport {
    pub outcomes: Vec<(i32, SubscriptionOutcome)>,
}

impl CycleReport {
    pub fn notified_total(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, outcome)| match outcome {
                SubscriptionOutcome::Notified { count } => *count,
                _ => 0,
            })
            .sum()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, o)| matches!(o, SubscriptionOutcome::Failed { .. }))
            .count()
    }

    pub fn outcome_of(&self, subscription_id: i32) -> Option<&SubscriptionOutcome> {
        self.outcomes
            .iter()
            .find(|(id, _)| *id == subscription_id)
            .map(|(_, outcome)| outcome)
    }
}

/// Releases the in-flight slot of a subscription when dropped.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<InFlightKey>>,
    key: InFlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight.remove(&self.key);
    }
}

/// Task that periodically checks every subscription for fresh, unseen ads.
pub struct ListingPoller {
    service: Arc<ListingWatchService>,
    registry: Arc<SubscriptionRegistry>,
    notifier: Arc<dyn Notifier>,
    poll_interval: Duration,
    max_concurrency: usize,
    running: AtomicBool,
    in_flight: Mutex<HashSet<InFlightKey>>,
}

impl ListingPoller {
    /// Creates a new poller with the given configuration.
    pub fn new(
        service: Arc<ListingWatchService>,
        notifier: Arc<dyn Notifier>,
        poll_interval: Duration,
        max_concurrency: usize,
    ) -> Arc<Self> {
        info!(
            "Initializing ListingPoller with poll interval {:?}",
            poll_interval
        );
        Arc::new(Self {
            registry: service.registry.clone(),
            service,
            notifier,
            poll_interval,
            max_concurrency: max_concurrency.max(1),
            running: AtomicBool::new(false),
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    /// Starts the polling loop. The first cycle runs immediately.
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Starting ListingPoller check loop.");
            self.spawn_check_loop();
        }
        Ok(())
    }

    /// Stops the polling loop after the current tick.
    pub fn stop(self: Arc<Self>) -> anyhow::Result<()> {
        info!("Stopping ListingPoller check loop.");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn spawn_check_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                if !self.running.load(Ordering::SeqCst) {
                    info!("Stopping check loop.");
                    break;
                }
                // Cycles may overlap; the in-flight guard keeps a slow subscription single.
                let poller = self.clone();
                tokio::spawn(async move {
                    if let Err(e) = poller.run_cycle().await {
                        error!("Error checking subscriptions: {}", e);
                    }
                });
            }
        });
    }

    /// Runs one full sweep over all subscriptions.
    pub async fn run_cycle(&self) -> anyhow::Result<CycleReport> {
        debug!("Checking subscriptions for new ads.");

        let subscriptions = self.registry.list_all().await?;
        info!("Found {} subscriptions to check.", subscriptions.len());

        let outcomes: Vec<(i32, SubscriptionOutcome)> = stream::iter(subscriptions)
            .map(|subscription| async move {
                let outcome = self.check_subscription(&subscription).await;
                (subscription.id, outcome)
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let report = CycleReport { outcomes };
        info!(
            "Finished checking subscriptions: {} notification(s), {} failure(s).",
            report.notified_total(),
            report.failed_count()
        );
        Ok(report)
    }

    async fn check_subscription(&self, subscription: &SubscriptionModel) -> SubscriptionOutcome {
        let Some(_guard) = self.try_acquire(subscription) else {
            debug!(
                "{} is still being checked, skipping.",
                Self::get_subscription_desc(subscription)
            );
            return SubscriptionOutcome::InFlight;
        };

        let fresh = match self.service.check_subscription(subscription).await {
            Ok(fresh) => fresh,
            Err(e) => {
                error!(
                    "Error checking {}: {e}",
                    Self::get_subscription_desc(subscription)
                );
                return SubscriptionOutcome::Failed {
                    error: e.to_string(),
                };
            }
        };

        if !fresh.is_empty() {
            info!(
                "Found {} new ad(s) for {}.",
                fresh.len(),
                Self::get_subscription_desc(subscription)
            );
        }

        for ad in &fresh {
            let notification = self.service.notification_for(ad);
            if let Err(e) = self
                .notifier
                .notify(&subscription.subscriber_id, &notification)
                .await
            {
                warn!(
                    "Failed to notify {} of {}: {e}",
                    subscription.subscriber_id, notification.link_url
                );
            }
        }

        SubscriptionOutcome::Notified { count: fresh.len() }
    }

    fn try_acquire(&self, subscription: &SubscriptionModel) -> Option<InFlightGuard<'_>> {
        let key = (subscription.subscriber_id.clone(), subscription.url.clone());
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    fn get_subscription_desc(subscription: &SubscriptionModel) -> String {
        format!(
            "subscription id `{}` ({})",
            subscription.id, subscription.url
        )
    }
}
