//! Chat commands and their handling.

use std::sync::Arc;

use log::info;
use log::warn;

use crate::notifier::Notifier;
use crate::notifier::NotifierError;
use crate::notifier::telegram_notifier::REMOVE_CALLBACK_PREFIX;
use crate::service::Services;
use crate::service::error::ServiceError;
use crate::service::listing_watch_service::SubscribeResult;

pub const WELCOME: &str = "Welcome";
pub const PARSING: &str = "Parsing...";
pub const SUBSCRIPTION_ADDED: &str = "Ads parsed, subscription added";
pub const ALREADY_SUBSCRIBED: &str = "You are already subscribed to this search.";
pub const SUBSCRIPTION_FAILED: &str =
    "Could not load this search, the subscription was not added. Please try again later.";
pub const SEARCH_UNREADABLE: &str =
    "Could not read this search page, the subscription was not added.";
pub const UNSUPPORTED_URL: &str =
    "This URL is not supported. Send a link to a search results page.";
pub const NO_SUBSCRIPTIONS: &str = "No subscriptions yet.";
pub const REQUEST_FAILED: &str = "Something went wrong, please try again later.";
pub const SUBSCRIPTION_REMOVED: &str = "Removed subscription!";
pub const SUBSCRIPTION_NOT_FOUND: &str = "Subscription not found.";
pub const USAGE: &str =
    "Send a search results URL to subscribe, or /list to see your subscriptions.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    List,
    Subscribe { url: String },
    Remove { subscription_id: i32 },
    Unknown,
}

impl Command {
    /// Parses a text message.
    pub fn parse(text: &str) -> Self {
        let text = text.trim();
        if let Some(name) = text.strip_prefix('/') {
            // `/list@my_bot` in group chats
            let name = name.split(['@', ' ']).next().unwrap_or_default();
            return match name {
                "start" => Command::Start,
                "list" => Command::List,
                _ => Command::Unknown,
            };
        }
        if text.starts_with("http://") || text.starts_with("https://") {
            return Command::Subscribe {
                url: text.to_string(),
            };
        }
        Command::Unknown
    }

    /// Parses the data of an inline button press.
    pub fn from_callback_data(data: &str) -> Self {
        data.strip_prefix(REMOVE_CALLBACK_PREFIX)
            .and_then(|id| id.parse::<i32>().ok())
            .map_or(Command::Unknown, |subscription_id| Command::Remove {
                subscription_id,
            })
    }
}

/// Executes commands on behalf of a subscriber and replies through the notifier.
pub struct CommandHandler {
    services: Arc<Services>,
    notifier: Arc<dyn Notifier>,
}

impl CommandHandler {
    pub fn new(services: Arc<Services>, notifier: Arc<dyn Notifier>) -> Self {
        Self { services, notifier }
    }

    pub async fn handle(&self, subscriber_id: &str, command: Command) -> Result<(), NotifierError> {
        match command {
            Command::Start => self.notifier.send_reply(subscriber_id, WELCOME).await,
            Command::List => self.list(subscriber_id).await,
            Command::Subscribe { url } => self.subscribe(subscriber_id, &url).await,
            Command::Remove { subscription_id } => {
                self.remove(subscriber_id, subscription_id).await
            }
            Command::Unknown => self.notifier.send_reply(subscriber_id, USAGE).await,
        }
    }

    async fn list(&self, subscriber_id: &str) -> Result<(), NotifierError> {
        match self.services.subscription_registry.list_for(subscriber_id).await {
            Ok(subscriptions) if subscriptions.is_empty() => {
                self.notifier.send_reply(subscriber_id, NO_SUBSCRIPTIONS).await
            }
            Ok(subscriptions) => {
                self.notifier
                    .deliver_subscription_list(subscriber_id, &subscriptions)
                    .await
            }
            Err(e) => {
                warn!("Failed to list subscriptions of {subscriber_id}: {e}");
                self.notifier.send_reply(subscriber_id, REQUEST_FAILED).await
            }
        }
    }

    async fn subscribe(&self, subscriber_id: &str, url: &str) -> Result<(), NotifierError> {
        let service = &self.services.listing_watch;
        if !service.aggregator.source().is_supported_url(url) {
            return self.notifier.send_reply(subscriber_id, UNSUPPORTED_URL).await;
        }

        self.notifier.send_reply(subscriber_id, PARSING).await?;
        let reply = match service.subscribe(subscriber_id, url).await {
            Ok(SubscribeResult::Success {
                subscription,
                baseline,
            }) => {
                info!(
                    "{subscriber_id} subscribed to {} ({baseline} ad(s) in baseline)",
                    subscription.url
                );
                SUBSCRIPTION_ADDED
            }
            Ok(SubscribeResult::AlreadySubscribed { .. }) => ALREADY_SUBSCRIBED,
            Err(ServiceError::ListingError(e)) if !e.is_fetch_failure() => {
                warn!("Failed to parse search {url} for {subscriber_id}: {e}");
                SEARCH_UNREADABLE
            }
            Err(e) => {
                warn!("Failed to subscribe {subscriber_id} to {url}: {e}");
                SUBSCRIPTION_FAILED
            }
        };
        self.notifier.send_reply(subscriber_id, reply).await
    }

    async fn remove(&self, subscriber_id: &str, subscription_id: i32) -> Result<(), NotifierError> {
        let registry = &self.services.subscription_registry;
        let reply = match registry.get(subscription_id).await {
            Ok(Some(subscription)) if subscription.subscriber_id == subscriber_id => {
                match registry.remove(subscription_id).await {
                    Ok(true) => SUBSCRIPTION_REMOVED,
                    Ok(false) => SUBSCRIPTION_NOT_FOUND,
                    Err(e) => {
                        warn!("Failed to remove subscription {subscription_id}: {e}");
                        REQUEST_FAILED
                    }
                }
            }
            Ok(_) => SUBSCRIPTION_NOT_FOUND,
            Err(e) => {
                warn!("Failed to look up subscription {subscription_id}: {e}");
                REQUEST_FAILED
            }
        };
        self.notifier.send_reply(subscriber_id, reply).await
    }
}
