//! Bridges chat messages to an admin Telegram chat.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{debug, instrument, warn};

use crate::config::TelegramConfig;
use crate::domain::UserId;
use crate::errors::{Error, Result};

/// Forwards user chat messages to the support channel. Implementations must
/// be cheap to call from request handlers; delivery happens fire-and-forget.
#[async_trait]
pub trait ChatNotifier: Send + Sync {
    async fn notify_admin(&self, user_id: &UserId, login: &str, text: &str) -> Result<()>;
}

/// Message text as the admin chat sees it: the sender tag line followed by
/// the message body.
pub fn format_admin_message(user_id: &UserId, login: &str, text: &str) -> String {
    format!("UserID:{} | {} wrote:\n{}", user_id, login, text)
}

#[derive(Serialize)]
struct SendMessageBody<'a> {
    chat_id: &'a str,
    text: &'a str,
}

/// Telegram Bot API client for the admin bridge.
pub struct TelegramClient {
    http: reqwest::Client,
    api_base: String,
    bot_token: String,
    admin_chat_id: String,
}

const DEFAULT_API_BASE: &str = "https://api.telegram.org";

impl TelegramClient {
    /// Build a client when the bot token and admin chat id are both present.
    pub fn from_config(config: &TelegramConfig) -> Option<Self> {
        let bot_token = config.bot_token.clone()?;
        let admin_chat_id = config.admin_chat_id.clone()?;
        let api_base = config.api_base.as_deref().unwrap_or(DEFAULT_API_BASE);

        Some(Self {
            http: reqwest::Client::new(),
            api_base: api_base.trim_end_matches('/').to_string(),
            bot_token,
            admin_chat_id,
        })
    }
}

#[async_trait]
impl ChatNotifier for TelegramClient {
    #[instrument(skip(self, text), fields(user_id = %user_id), name = "telegram_notify_admin")]
    async fn notify_admin(&self, user_id: &UserId, login: &str, text: &str) -> Result<()> {
        let url = format!("{}/bot{}/sendMessage", self.api_base, self.bot_token);
        let body = SendMessageBody {
            chat_id: &self.admin_chat_id,
            text: &format_admin_message(user_id, login, text),
        };

        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::internal(format!("Telegram request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            warn!(%status, "Telegram rejected the message");
            return Err(Error::internal(format!("Telegram returned status {}", status)));
        }

        debug!("Message forwarded to the admin chat");
        Ok(())
    }
}

/// Stand-in used when the bot is not configured. Messages are logged and
/// dropped so the chat endpoints keep working in development.
pub struct NoopNotifier;

#[async_trait]
impl ChatNotifier for NoopNotifier {
    async fn notify_admin(&self, user_id: &UserId, login: &str, text: &str) -> Result<()> {
        debug!(%user_id, login, text, "Telegram bridge disabled, dropping message");
        Ok(())
    }
}
