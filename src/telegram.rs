//! Minimal Telegram Bot API client.

use log::debug;
use serde::Deserialize;
use serde::Serialize;
use serde::de::DeserializeOwned;
use reqwest::header::CONTENT_TYPE;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TelegramError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Failed to parse API response: {0}")]
    JsonParseFailed(#[from] serde_json::Error),

    #[error("Telegram API error: {description}")]
    ApiError { description: String },
}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        TelegramError::RequestFailed(Box::new(e))
    }
}

#[derive(Deserialize, Debug)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Chat {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct User {
    pub id: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct SendPhoto<'a> {
    chat_id: &'a str,
    photo: &'a str,
    caption: &'a str,
    parse_mode: &'a str,
}

#[derive(Serialize)]
struct GetUpdates {
    #[serde(skip_serializing_if = "Option::is_none")]
    offset: Option<i64>,
    timeout: u64,
    allowed_updates: [&'static str; 2],
}

#[derive(Serialize)]
struct AnswerCallbackQuery<'a> {
    callback_query_id: &'a str,
}

pub const MARKDOWN_V2: &str = "MarkdownV2";

/// Telegram Bot API over HTTPS.
pub struct TelegramClient {
    client: reqwest::Client,
    api_url: String,
}

impl TelegramClient {
    /// `api_url` is the API root, e.g. `https://api.telegram.org`.
    pub fn new(api_url: &str, token: &str) -> Result<Self, TelegramError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            api_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    async fn call<P: Serialize, T: DeserializeOwned>(
        &self,
        method: &str,
        payload: &P,
    ) -> Result<T, TelegramError> {
        debug!("Calling Telegram method {method}");
        let body = serde_json::to_string(payload)?;
        let response = self
            .client
            .post(format!("{}/{method}", self.api_url))
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let text = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&text)?;

        match parsed {
            ApiResponse {
                ok: true,
                result: Some(result),
                ..
            } => Ok(result),
            ApiResponse { description, .. } => Err(TelegramError::ApiError {
                description: description.unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }

    pub async fn send_message(
        &self,
        chat_id: &str,
        text: &str,
        parse_mode: Option<&str>,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        self.call(
            "sendMessage",
            &SendMessage {
                chat_id,
                text,
                parse_mode,
                reply_markup,
            },
        )
        .await
    }

    /// Sends a photo by URL with a MarkdownV2 caption.
    pub async fn send_photo(
        &self,
        chat_id: &str,
        photo: &str,
        caption: &str,
    ) -> Result<Message, TelegramError> {
        self.call(
            "sendPhoto",
            &SendPhoto {
                chat_id,
                photo,
                caption,
                parse_mode: MARKDOWN_V2,
            },
        )
        .await
    }

    /// Long-polls for updates after `offset`, waiting up to `timeout` seconds.
    pub async fn get_updates(
        &self,
        offset: Option<i64>,
        timeout: u64,
    ) -> Result<Vec<Update>, TelegramError> {
        self.call(
            "getUpdates",
            &GetUpdates {
                offset,
                timeout,
                allowed_updates: ["message", "callback_query"],
            },
        )
        .await
    }

    pub async fn answer_callback_query(
        &self,
        callback_query_id: &str,
    ) -> Result<bool, TelegramError> {
        self.call(
            "answerCallbackQuery",
            &AnswerCallbackQuery { callback_query_id },
        )
        .await
    }
}
