//! Telegram bot front end: long polling and dispatch to the command handler.

pub mod commands;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::error;
use log::info;
use log::warn;

use crate::bot::commands::Command;
use crate::bot::commands::CommandHandler;
use crate::telegram::TelegramClient;
use crate::telegram::Update;

/// Seconds Telegram holds a `getUpdates` request open.
const LONG_POLL_TIMEOUT: u64 = 30;
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram bot receiving updates by long polling.
pub struct TelegramBot {
    client: Arc<TelegramClient>,
    handler: Arc<CommandHandler>,
    running: AtomicBool,
}

impl TelegramBot {
    pub fn new(client: Arc<TelegramClient>, handler: Arc<CommandHandler>) -> Arc<Self> {
        Arc::new(Self {
            client,
            handler,
            running: AtomicBool::new(false),
        })
    }

    /// Starts the update loop.
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
        {
            info!("Starting TelegramBot update loop.");
            self.spawn_update_loop();
        }
        Ok(())
    }

    pub fn stop(self: Arc<Self>) -> anyhow::Result<()> {
        info!("Stopping TelegramBot update loop.");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn spawn_update_loop(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut offset = None;
            while self.running.load(Ordering::SeqCst) {
                let updates = match self.client.get_updates(offset, LONG_POLL_TIMEOUT).await {
                    Ok(updates) => updates,
                    Err(e) => {
                        warn!("Failed to fetch updates: {e}");
                        tokio::time::sleep(RETRY_DELAY).await;
                        continue;
                    }
                };

                for update in updates {
                    offset = Some(update.update_id + 1);
                    let bot = self.clone();
                    // Subscribing waits for a full search fetch; keep polling meanwhile.
                    tokio::spawn(async move { bot.dispatch(update).await });
                }
            }
            info!("Stopped update loop.");
        });
    }

    async fn dispatch(&self, update: Update) {
        if let Some(message) = update.message
            && let Some(text) = message.text
        {
            let subscriber_id = message.chat.id.to_string();
            debug!("Message from {subscriber_id}: {text}");
            if let Err(e) = self
                .handler
                .handle(&subscriber_id, Command::parse(&text))
                .await
            {
                error!("Failed to reply to {subscriber_id}: {e}");
            }
        }

        if let Some(query) = update.callback_query {
            if let Err(e) = self.client.answer_callback_query(&query.id).await {
                warn!("Failed to answer callback query {}: {e}", query.id);
            }
            let subscriber_id = query
                .message
                .map_or(query.from.id, |m| m.chat.id)
                .to_string();
            let command = Command::from_callback_data(query.data.as_deref().unwrap_or_default());
            if let Err(e) = self.handler.handle(&subscriber_id, command).await {
                error!("Failed to reply to {subscriber_id}: {e}");
            }
        }
    }
}
