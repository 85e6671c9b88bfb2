//! Chat and message identifiers shared by the gateway and the relay pipeline.

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::AppError;

/// Numeric Telegram chat identifier (groups and channels are negative).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct ChatId(pub i64);

impl Display for ChatId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Message identifier, unique only within its chat.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct MessageId(pub i64);

impl Display for MessageId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A chat addressed either by numeric id or by public `@username`.
///
/// Deserializes from a TOML/JSON integer or string; strings that parse as
/// integers are treated as ids.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawChatRef")]
pub enum ChatRef {
    /// Numeric chat id.
    Id(ChatId),
    /// Public username, stored without the leading `@`.
    Username(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawChatRef {
    Int(i64),
    Text(String),
}

impl TryFrom<RawChatRef> for ChatRef {
    type Error = AppError;

    fn try_from(raw: RawChatRef) -> Result<Self, Self::Error> {
        match raw {
            RawChatRef::Int(id) => Ok(Self::Id(ChatId(id))),
            RawChatRef::Text(text) => text.parse(),
        }
    }
}

impl FromStr for ChatRef {
    type Err = AppError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let trimmed = raw.trim();
        if let Ok(id) = trimmed.parse::<i64>() {
            return Ok(Self::Id(ChatId(id)));
        }
        let name = trimmed.strip_prefix('@').unwrap_or(trimmed);
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(AppError::Config(format!("invalid chat reference: {raw:?}")));
        }
        Ok(Self::Username(name.to_owned()))
    }
}

impl Display for ChatRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Id(id) => write!(f, "{id}"),
            Self::Username(name) => write!(f, "@{name}"),
        }
    }
}

impl From<ChatId> for ChatRef {
    fn from(id: ChatId) -> Self {
        Self::Id(id)
    }
}

impl ChatRef {
    /// Whether this reference designates the chat with the given id and
    /// optional username. Username comparison ignores ASCII case.
    #[must_use]
    pub fn matches(&self, id: ChatId, username: Option<&str>) -> bool {
        match self {
            Self::Id(own) => *own == id,
            Self::Username(own) => username.is_some_and(|name| name.eq_ignore_ascii_case(own)),
        }
    }
}

/// A message as returned by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Identifier within `chat_id`.
    pub id: MessageId,
    /// Chat the message lives in.
    pub chat_id: ChatId,
    /// Text or caption, when the gateway knows it.
    pub text: Option<String>,
}
