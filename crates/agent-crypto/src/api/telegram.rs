//! Telegram Bot API client
//!
//! Only the handful of methods the bot needs: long polling, text and photo
//! messages with inline keyboards, message deletion and callback answers.

use crate::error::{CryptoError, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.telegram.org";

/// Extra time a `getUpdates` request gets on top of the server-side poll
const POLL_GRACE: Duration = Duration::from_secs(10);

/// Envelope of every Bot API response
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct Chat {
    pub id: i64,
}

/// A press on an inline keyboard button
#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub data: Option<String>,
    /// The message carrying the keyboard
    pub message: Option<TelegramMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// Outgoing side of a chat
///
/// Send methods return the id of the message they created.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<i64>;

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<i64>;

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()>;

    /// Acknowledge a button press so the client stops its spinner
    async fn answer_callback(&self, callback_id: &str) -> Result<()>;
}

/// HTTP client for one bot token
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    base_url: String,
}

impl std::fmt::Debug for TelegramClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramClient").finish_non_exhaustive()
    }
}

impl TelegramClient {
    pub fn new(token: &str, timeout: Duration) -> Result<Self> {
        Self::with_base_url(BASE_URL, token, timeout)
    }

    pub fn with_base_url(base_url: &str, token: &str, timeout: Duration) -> Result<Self> {
        if token.trim().is_empty() {
            return Err(CryptoError::Telegram("bot token is empty".to_string()));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: format!("{}/bot{token}", base_url.trim_end_matches('/')),
        })
    }

    fn url(&self, method: &str) -> String {
        format!("{}/{method}", self.base_url)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        parse_envelope(method, status, &body)
    }

    /// Long-poll for updates after `offset`
    pub async fn get_updates(&self, offset: i64, timeout_secs: u64) -> Result<Vec<Update>> {
        let request = self
            .client
            .post(self.url("getUpdates"))
            .timeout(poll_request_timeout(timeout_secs))
            .json(&json!({
                "offset": offset,
                "timeout": timeout_secs,
                "allowed_updates": ["message", "callback_query"],
            }));
        self.call("getUpdates", request).await
    }
}

/// Client-side deadline for a long poll of `timeout_secs`
fn poll_request_timeout(timeout_secs: u64) -> Duration {
    Duration::from_secs(timeout_secs) + POLL_GRACE
}

/// Unwrap the `{ok, result, description}` envelope of a Bot API reply
fn parse_envelope<T: DeserializeOwned>(method: &str, status: StatusCode, body: &str) -> Result<T> {
    let envelope: ApiResponse<serde_json::Value> = serde_json::from_str(body).map_err(|e| {
        CryptoError::Telegram(format!("{method} failed ({status}): unreadable response: {e}"))
    })?;

    if !envelope.ok {
        return Err(CryptoError::Telegram(format!(
            "{method} failed ({status}): {}",
            envelope.description.unwrap_or_default()
        )));
    }

    let result = envelope.result.ok_or_else(|| {
        CryptoError::Telegram(format!("{method} reported ok without a result"))
    })?;
    serde_json::from_value(result).map_err(|e| {
        CryptoError::Telegram(format!("{method} returned an unexpected result: {e}"))
    })
}

#[async_trait]
impl ChatTransport for TelegramClient {
    async fn send_text(
        &self,
        chat_id: i64,
        text: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<i64> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = markup {
            body["reply_markup"] = serde_json::to_value(markup)?;
        }

        let request = self.client.post(self.url("sendMessage")).json(&body);
        let message: TelegramMessage = self.call("sendMessage", request).await?;
        debug!(chat_id, message_id = message.message_id, "Text sent");
        Ok(message.message_id)
    }

    async fn send_photo(
        &self,
        chat_id: i64,
        photo: &Path,
        caption: &str,
        markup: Option<InlineKeyboardMarkup>,
    ) -> Result<i64> {
        let bytes = tokio::fs::read(photo).await?;
        let file_name = photo
            .file_name()
            .map_or_else(|| "chart.png".to_string(), |n| n.to_string_lossy().into_owned());
        let part = Part::bytes(bytes).file_name(file_name).mime_str("image/png")?;

        let mut form = Form::new()
            .text("chat_id", chat_id.to_string())
            .text("caption", caption.to_string())
            .part("photo", part);
        if let Some(markup) = markup {
            form = form.text("reply_markup", serde_json::to_string(&markup)?);
        }

        let request = self.client.post(self.url("sendPhoto")).multipart(form);
        let message: TelegramMessage = self.call("sendPhoto", request).await?;
        debug!(chat_id, message_id = message.message_id, "Photo sent");
        Ok(message.message_id)
    }

    async fn delete_message(&self, chat_id: i64, message_id: i64) -> Result<()> {
        let request = self
            .client
            .post(self.url("deleteMessage"))
            .json(&json!({ "chat_id": chat_id, "message_id": message_id }));
        let _: bool = self.call("deleteMessage", request).await?;
        Ok(())
    }

    async fn answer_callback(&self, callback_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("answerCallbackQuery"))
            .json(&json!({ "callback_query_id": callback_id }));
        let _: bool = self.call("answerCallbackQuery", request).await?;
        Ok(())
    }
}
