//! Telegram rendering of notifications and subscription lists.

use std::sync::Arc;

use async_trait::async_trait;
use log::debug;
use log::warn;

use crate::model::SubscriptionModel;
use crate::notifier::Notification;
use crate::notifier::Notifier;
use crate::notifier::NotifierError;
use crate::telegram::InlineKeyboardButton;
use crate::telegram::InlineKeyboardMarkup;
use crate::telegram::MARKDOWN_V2;
use crate::telegram::TelegramClient;

pub const REMOVE_CALLBACK_PREFIX: &str = "remove_subscription_";

pub struct TelegramNotifier {
    client: Arc<TelegramClient>,
}

impl TelegramNotifier {
    pub fn new(client: Arc<TelegramClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(
        &self,
        subscriber_id: &str,
        notification: &Notification,
    ) -> Result<(), NotifierError> {
        let caption = caption(notification);
        if notification.image_url.is_empty() {
            self.client
                .send_message(subscriber_id, &caption, Some(MARKDOWN_V2), None)
                .await?;
        } else if let Err(e) = self
            .client
            .send_photo(subscriber_id, &notification.image_url, &caption)
            .await
        {
            warn!(
                "Photo {} rejected for {subscriber_id}, sending text instead: {e}",
                notification.image_url
            );
            self.client
                .send_message(subscriber_id, &caption, Some(MARKDOWN_V2), None)
                .await?;
        }
        debug!("Notified {subscriber_id} of {}", notification.link_url);
        Ok(())
    }

    async fn deliver_subscription_list(
        &self,
        subscriber_id: &str,
        subscriptions: &[SubscriptionModel],
    ) -> Result<(), NotifierError> {
        for subscription in subscriptions {
            let markup = remove_button(subscription.id);
            self.client
                .send_message(subscriber_id, &subscription.url, None, Some(&markup))
                .await?;
        }
        Ok(())
    }

    async fn send_reply(&self, subscriber_id: &str, text: &str) -> Result<(), NotifierError> {
        self.client
            .send_message(subscriber_id, text, None, None)
            .await?;
        Ok(())
    }
}

/// `[title](link), price` in MarkdownV2.
pub fn caption(notification: &Notification) -> String {
    format!(
        "[{}]({}), {}",
        escape_markdown(&notification.title),
        escape_link_url(&notification.link_url),
        escape_markdown(&notification.price_text)
    )
}

pub fn remove_button(subscription_id: i32) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton {
            text: "Remove".to_string(),
            callback_data: format!("{REMOVE_CALLBACK_PREFIX}{subscription_id}"),
        }]],
    }
}

/// Escapes MarkdownV2 reserved characters in ordinary text.
pub fn escape_markdown(text: &str) -> String {
    const RESERVED: &[char] = &[
        '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.',
        '!',
    ];
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if RESERVED.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Inside the `(...)` of an inline link only `)` and `\` are reserved.
pub fn escape_link_url(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}
