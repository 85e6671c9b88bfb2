//! Republishes matched source messages into the requesting chat.

use std::sync::Arc;

use tracing::{error, info};

use crate::gateway::Gateway;
use crate::models::{ChatId, MatchCandidate, MessageId, RelayResult};

/// Performs the single copy of a relay.
#[derive(Clone)]
pub struct RelayForwarder {
    gateway: Arc<dyn Gateway>,
}

impl RelayForwarder {
    /// Create a forwarder over `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Copy `candidate` into `target_chat`, pairing the copy with the
    /// triggering `original_message_id`.
    ///
    /// Exactly one copy attempt is made. On failure the error is logged and
    /// `None` is returned, which leaves the trigger message in place.
    pub async fn relay(
        &self,
        candidate: &MatchCandidate,
        target_chat: ChatId,
        original_message_id: MessageId,
    ) -> Option<RelayResult> {
        match self
            .gateway
            .copy_message(target_chat, candidate.chat_id, candidate.message_id)
            .await
        {
            Ok(copied) => {
                info!(
                    source_chat = %candidate.chat_id,
                    source_message_id = %candidate.message_id,
                    chat_id = %target_chat,
                    copied_message_id = %copied.id,
                    "source message copied"
                );
                Some(RelayResult {
                    chat_id: target_chat,
                    original_message_id,
                    copied_message_id: copied.id,
                })
            }
            Err(err) => {
                error!(
                    source_chat = %candidate.chat_id,
                    source_message_id = %candidate.message_id,
                    chat_id = %target_chat,
                    %err,
                    "copy failed"
                );
                None
            }
        }
    }
}
