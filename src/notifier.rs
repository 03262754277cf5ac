//! Delivery of notifications and replies to subscribers.

use async_trait::async_trait;

use crate::model::SubscriptionModel;
use crate::telegram::TelegramError;

pub mod telegram_notifier;

/// A new ad, ready to be rendered by a chat front end.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    /// Price with its currency, e.g. `150€`.
    pub price_text: String,
    /// Empty when the ad has no image.
    pub image_url: String,
    pub link_url: String,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum NotifierError {
    #[error("TelegramError: {0}")]
    TelegramError(#[from] TelegramError),

    #[error("Delivery failed: {message}")]
    DeliveryFailed { message: String },
}

/// Outbound channel to subscribers.
///
/// Callers treat delivery as fire-and-forget: errors are logged, never retried.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        subscriber_id: &str,
        notification: &Notification,
    ) -> Result<(), NotifierError>;

    async fn deliver_subscription_list(
        &self,
        subscriber_id: &str,
        subscriptions: &[SubscriptionModel],
    ) -> Result<(), NotifierError>;

    /// Plain text reply to a command.
    async fn send_reply(&self, subscriber_id: &str, text: &str) -> Result<(), NotifierError>;
}
