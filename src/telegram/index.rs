//! In-memory search index of source-channel posts.
//!
//! The Bot API cannot search a chat, so posts are recorded as the bot
//! receives them and searched locally. The index is bounded; once full,
//! the oldest post (lowest message id) is evicted. It is rebuilt from
//! scratch on every start.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use crate::models::{ChatId, Message, MessageId};

#[derive(Debug, Clone)]
struct IndexedPost {
    chat_id: ChatId,
    text: String,
    folded: String,
}

/// Bounded, newest-first searchable store of channel posts.
#[derive(Debug)]
pub struct ChannelIndex {
    capacity: usize,
    posts: Mutex<BTreeMap<MessageId, IndexedPost>>,
}

impl ChannelIndex {
    /// Create an empty index holding at most `capacity` posts.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            posts: Mutex::new(BTreeMap::new()),
        }
    }

    /// Insert a post, replacing any earlier version with the same id.
    pub fn upsert(&self, chat_id: ChatId, message_id: MessageId, text: &str) {
        let mut posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        posts.insert(
            message_id,
            IndexedPost {
                chat_id,
                text: text.to_owned(),
                folded: text.to_lowercase(),
            },
        );
        while posts.len() > self.capacity {
            posts.pop_first();
        }
    }

    /// Drop a post, if present.
    pub fn remove(&self, message_id: MessageId) {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&message_id);
    }

    /// Number of indexed posts.
    #[must_use]
    pub fn len(&self) -> usize {
        self.posts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the index holds no posts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Case-insensitive substring search, newest post first, stopping after
    /// `limit` hits.
    #[must_use]
    pub fn search(&self, query: &str, limit: usize) -> Vec<Message> {
        let needle = query.to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Vec::new();
        }

        let posts = self.posts.lock().unwrap_or_else(PoisonError::into_inner);
        posts
            .iter()
            .rev()
            .filter(|(_, post)| post.folded.contains(&needle))
            .take(limit)
            .map(|(id, post)| Message {
                id: *id,
                chat_id: post.chat_id,
                text: Some(post.text.clone()),
            })
            .collect()
    }
}
