//! Bot API client implementing [`Gateway`].

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::index::ChannelIndex;
use super::types::{ApiResponse, CopiedMessageId, TelegramUser, Update};
use crate::config::TelegramConfig;
use crate::gateway::{Gateway, GatewayFuture};
use crate::models::{ChatId, ChatRef, Message, MessageId};
use crate::{AppError, Result};

/// Default timeout for non-polling API calls.
const API_TIMEOUT: Duration = Duration::from_secs(30);
/// Extra headroom on top of the long-poll timeout.
const POLL_TIMEOUT_SLACK: Duration = Duration::from_secs(10);

/// Update kinds requested from `getUpdates`.
const ALLOWED_UPDATES: [&str; 4] = [
    "message",
    "edited_message",
    "channel_post",
    "edited_channel_post",
];

/// Telegram Bot API gateway.
///
/// Copy and delete go straight to the Bot API. Search is served from the
/// [`ChannelIndex`] of the configured source channel.
pub struct TelegramGateway {
    http: reqwest::Client,
    bot_url: String,
    source: ChatRef,
    index: Arc<ChannelIndex>,
}

impl TelegramGateway {
    /// Build a gateway from configuration with loaded credentials.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the bot token is missing, or
    /// `AppError::Telegram` if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig, index: Arc<ChannelIndex>) -> Result<Self> {
        if config.bot_token.is_empty() {
            return Err(AppError::Config("telegram bot token not loaded".into()));
        }
        let http = reqwest::Client::builder()
            .timeout(API_TIMEOUT)
            .build()
            .map_err(|err| AppError::Telegram(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            bot_url: format!("{}/bot{}", config.api_base, config.bot_token),
            source: config.source_channel.clone(),
            index,
        })
    }

    /// Source channel this gateway indexes.
    #[must_use]
    pub fn source(&self) -> &ChatRef {
        &self.source
    }

    /// The source-channel search index.
    #[must_use]
    pub fn index(&self) -> &Arc<ChannelIndex> {
        &self.index
    }

    /// Verify the token and return the bot's own user.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Telegram` if the token is rejected.
    pub async fn get_me(&self) -> Result<TelegramUser> {
        let me: TelegramUser = self
            .call("getMe", &serde_json::json!({}), API_TIMEOUT)
            .await?;
        info!(bot_id = me.id, username = ?me.username, "telegram bot authenticated");
        Ok(me)
    }

    /// Long-poll for updates after `offset`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Telegram` on transport or API failure.
    pub async fn get_updates(&self, offset: i64, timeout_seconds: u32) -> Result<Vec<Update>> {
        let params = serde_json::json!({
            "offset": offset,
            "timeout": timeout_seconds,
            "allowed_updates": ALLOWED_UPDATES,
        });
        let timeout = Duration::from_secs(u64::from(timeout_seconds)) + POLL_TIMEOUT_SLACK;
        self.call("getUpdates", &params, timeout).await
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: &serde_json::Value,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .http
            .post(format!("{}/{method}", self.bot_url))
            .json(params)
            .timeout(timeout)
            .send()
            .await
            .map_err(|err| AppError::Telegram(format!("{method}: {}", err.without_url())))?;

        // Error replies carry a JSON envelope too, whatever the HTTP status.
        let body = response
            .bytes()
            .await
            .map_err(|err| AppError::Telegram(format!("{method}: {}", err.without_url())))?;
        let envelope: ApiResponse<T> = serde_json::from_slice(&body)?;
        decode_envelope(method, envelope)
    }
}

/// Unwrap a Bot API envelope into its result.
///
/// # Errors
///
/// Returns `AppError::Telegram` when `ok` is false or the result is absent.
pub fn decode_envelope<T>(method: &str, envelope: ApiResponse<T>) -> Result<T> {
    if !envelope.ok {
        return Err(AppError::Telegram(format!(
            "{method} failed ({}): {}",
            envelope.error_code.unwrap_or_default(),
            envelope.description.unwrap_or_default()
        )));
    }
    envelope
        .result
        .ok_or_else(|| AppError::Telegram(format!("{method} returned ok without a result")))
}

/// Whether a Bot API error says the referenced message no longer exists.
#[must_use]
pub fn is_missing_message(err: &AppError) -> bool {
    match err {
        AppError::Telegram(msg) => {
            let msg = msg.to_ascii_lowercase();
            msg.contains("message to delete not found")
                || msg.contains("message to copy not found")
                || msg.contains("message_id_invalid")
        }
        _ => false,
    }
}

impl Gateway for TelegramGateway {
    fn search_messages<'a>(
        &'a self,
        chat: &'a ChatRef,
        query: &'a str,
        limit: usize,
    ) -> GatewayFuture<'a, Vec<Message>> {
        Box::pin(async move {
            if *chat != self.source {
                return Err(AppError::NotFound(format!("no search index for chat {chat}")));
            }
            let results = self.index.search(query, limit);
            debug!(
                indexed = self.index.len(),
                hits = results.len(),
                "source index searched"
            );
            Ok(results)
        })
    }

    fn copy_message(
        &self,
        target: ChatId,
        source: ChatId,
        message_id: MessageId,
    ) -> GatewayFuture<'_, Message> {
        Box::pin(async move {
            let params = serde_json::json!({
                "chat_id": target.0,
                "from_chat_id": source.0,
                "message_id": message_id.0,
            });
            match self
                .call::<CopiedMessageId>("copyMessage", &params, API_TIMEOUT)
                .await
            {
                Ok(copied) => Ok(Message {
                    id: MessageId(copied.message_id),
                    chat_id: target,
                    text: None,
                }),
                Err(err) => {
                    if is_missing_message(&err) {
                        warn!(%message_id, "source post is gone; dropping it from the index");
                        self.index.remove(message_id);
                    }
                    Err(err)
                }
            }
        })
    }

    fn delete_messages<'a>(
        &'a self,
        chat: ChatId,
        message_ids: &'a [MessageId],
    ) -> GatewayFuture<'a, ()> {
        Box::pin(async move {
            let ids: Vec<i64> = message_ids.iter().map(|id| id.0).collect();
            let params = serde_json::json!({
                "chat_id": chat.0,
                "message_ids": ids,
            });
            match self
                .call::<bool>("deleteMessages", &params, API_TIMEOUT)
                .await
            {
                Ok(_) => Ok(()),
                Err(err) if is_missing_message(&err) => {
                    debug!(%chat, ?message_ids, "messages already gone");
                    Ok(())
                }
                Err(err) => Err(err),
            }
        })
    }
}
