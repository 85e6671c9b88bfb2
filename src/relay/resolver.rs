//! Single-result lookup against the source channel.

use std::sync::Arc;

use tracing::{error, warn};

use crate::gateway::Gateway;
use crate::models::{MatchCandidate, SearchQuery};

/// Issues bounded searches and keeps the first hit.
///
/// Ranking is left entirely to the backend: whatever it yields first wins.
#[derive(Clone)]
pub struct MatchResolver {
    gateway: Arc<dyn Gateway>,
}

impl MatchResolver {
    /// Create a resolver over `gateway`.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>) -> Self {
        Self { gateway }
    }

    /// Run one search for `query` and return its first result.
    ///
    /// Both "no match" and a failed search yield `None`; the former is
    /// logged as a warning, the latter as an error.
    pub async fn resolve(&self, query: &SearchQuery) -> Option<MatchCandidate> {
        let results = match self
            .gateway
            .search_messages(&query.source_chat, &query.query_text, query.limit)
            .await
        {
            Ok(results) => results,
            Err(err) => {
                error!(
                    source = %query.source_chat,
                    query = %query.query_text,
                    %err,
                    "source search failed"
                );
                return None;
            }
        };

        let Some(first) = results.into_iter().next() else {
            warn!(
                source = %query.source_chat,
                query = %query.query_text,
                "no matching source message; staying silent"
            );
            return None;
        };

        Some(MatchCandidate {
            chat_id: first.chat_id,
            message_id: first.id,
        })
    }
}
