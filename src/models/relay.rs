//! Transient entities flowing through one relay cycle.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::chat::{ChatId, ChatRef, MessageId};

/// A new message observed in any chat the bot can see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomingEvent {
    /// Chat the message was posted in.
    pub chat_id: ChatId,
    /// Identifier of the posted message.
    pub message_id: MessageId,
    /// Whether the message was composed through another bot's inline mode.
    pub sent_via_bot: bool,
    /// Plain text payload; `None` for media, stickers and service messages.
    pub text: Option<String>,
}

/// A bounded lookup against the source channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Channel searched for matches.
    pub source_chat: ChatRef,
    /// Full text of the triggering message.
    pub query_text: String,
    /// Maximum number of results requested from the backend.
    pub limit: usize,
}

/// The single message selected from a search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Chat the candidate lives in; used as the copy source.
    pub chat_id: ChatId,
    /// Identifier of the candidate message.
    pub message_id: MessageId,
}

/// Outcome of a successful copy: the trigger/copy pair to clean up later.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayResult {
    /// Group where the query was posted and the copy landed.
    pub chat_id: ChatId,
    /// The user's triggering message.
    pub original_message_id: MessageId,
    /// The copy produced by the relay.
    pub copied_message_id: MessageId,
}

/// Lifecycle of a scheduled cleanup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CleanupState {
    /// Created; timer running.
    Pending,
    /// Delay elapsed; deletion about to be attempted.
    Due,
    /// Deletion attempted, whatever the outcome.
    Completed,
}

/// A deferred deletion of one trigger/copy pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupTask {
    /// Correlation id for log lines.
    pub task_id: String,
    /// Chat both messages live in.
    pub chat_id: ChatId,
    /// `[original, copy]`, deleted in one batched request.
    pub message_ids: [MessageId; 2],
    /// When the task was created.
    pub scheduled_at: DateTime<Utc>,
    /// Earliest instant the deletion may run.
    pub due_at: DateTime<Utc>,
}

impl CleanupTask {
    /// Build a task for `result` that falls due `delay` after now.
    #[must_use]
    pub fn new(result: &RelayResult, delay: std::time::Duration) -> Self {
        let scheduled_at = Utc::now();
        let due_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|delta| scheduled_at.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self {
            task_id: Uuid::new_v4().to_string(),
            chat_id: result.chat_id,
            message_ids: [result.original_message_id, result.copied_message_id],
            scheduled_at,
            due_at,
        }
    }
}
