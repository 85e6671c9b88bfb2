//! Bot API wire types (only the fields the relay reads).

use serde::Deserialize;

use crate::models::{ChatId, IncomingEvent, MessageId};

/// The `{ ok, result, description }` envelope every Bot API call returns.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    /// Whether the call succeeded.
    pub ok: bool,
    /// Payload on success.
    pub result: Option<T>,
    /// Human-readable error on failure.
    pub description: Option<String>,
    /// Numeric error code on failure.
    pub error_code: Option<i32>,
}

/// One entry of a `getUpdates` batch.
#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    /// Monotonic update identifier used for the polling offset.
    pub update_id: i64,
    /// New message in a private chat, group or supergroup.
    pub message: Option<TelegramMessage>,
    /// Edited message in a private chat, group or supergroup.
    pub edited_message: Option<TelegramMessage>,
    /// New post in a channel.
    pub channel_post: Option<TelegramMessage>,
    /// Edited channel post.
    pub edited_channel_post: Option<TelegramMessage>,
}

/// Subset of the Bot API `Message` object.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramMessage {
    /// Identifier within the chat.
    pub message_id: i64,
    /// Chat the message belongs to.
    pub chat: TelegramChat,
    /// Text of a text message.
    pub text: Option<String>,
    /// Caption of a media message.
    pub caption: Option<String>,
    /// Bot through which the message was sent (inline mode).
    pub via_bot: Option<TelegramUser>,
}

impl TelegramMessage {
    /// Convert into the pipeline's inbound event.
    #[must_use]
    pub fn to_incoming_event(&self) -> IncomingEvent {
        IncomingEvent {
            chat_id: ChatId(self.chat.id),
            message_id: MessageId(self.message_id),
            sent_via_bot: self.via_bot.is_some(),
            text: self.text.clone(),
        }
    }

    /// Searchable text: the message text, or the caption for media posts.
    #[must_use]
    pub fn searchable_text(&self) -> Option<&str> {
        self.text.as_deref().or(self.caption.as_deref())
    }
}

/// Subset of the Bot API `Chat` object.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramChat {
    /// Chat id.
    pub id: i64,
    /// `private`, `group`, `supergroup` or `channel`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Public username, when set.
    pub username: Option<String>,
}

/// Subset of the Bot API `User` object.
#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    /// User id.
    pub id: i64,
    /// Username, when set.
    pub username: Option<String>,
}

/// Result of `copyMessage`.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct CopiedMessageId {
    /// Identifier of the new message in the target chat.
    pub message_id: i64,
}
