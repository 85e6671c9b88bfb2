//! Eligibility check for inbound messages.

use tracing::debug;

use crate::models::{ChatId, ChatRef, IncomingEvent, SearchQuery};

/// Shortest text, in characters, that is ever searched.
pub const MIN_QUERY_CHARS: usize = 3;

/// Results requested per search; only the first match is ever used.
pub const SEARCH_LIMIT: usize = 1;

/// Decides which inbound messages become searches.
#[derive(Debug, Clone)]
pub struct InboundFilter {
    target_group: ChatId,
    source_chat: ChatRef,
}

impl InboundFilter {
    /// Accept messages from `target_group`; queries go to `source_chat`.
    #[must_use]
    pub fn new(target_group: ChatId, source_chat: ChatRef) -> Self {
        Self {
            target_group,
            source_chat,
        }
    }

    /// Return a [`SearchQuery`] for eligible events, `None` otherwise.
    ///
    /// Rejection is the common case and is never an error. The query text
    /// is the message text exactly as received.
    #[must_use]
    pub fn accept(&self, event: &IncomingEvent) -> Option<SearchQuery> {
        if event.chat_id != self.target_group {
            return None;
        }

        if event.sent_via_bot {
            debug!(message_id = %event.message_id, "via-bot message ignored");
            return None;
        }

        let Some(text) = event.text.as_deref() else {
            debug!(message_id = %event.message_id, "non-text message ignored");
            return None;
        };

        if text.chars().count() < MIN_QUERY_CHARS {
            debug!(message_id = %event.message_id, "short or empty message ignored");
            return None;
        }

        Some(SearchQuery {
            source_chat: self.source_chat.clone(),
            query_text: text.to_owned(),
            limit: SEARCH_LIMIT,
        })
    }
}
