//! Messaging backend abstraction.
//!
//! The [`Gateway`] trait decouples the relay pipeline from the transport
//! that actually talks to the messaging service. The pipeline only ever
//! needs three remote operations: a bounded search, a copy, and a batched
//! delete. Implementations must be safe to call concurrently from many
//! in-flight tasks.

use std::future::Future;
use std::pin::Pin;

use crate::models::{ChatId, ChatRef, Message, MessageId};
use crate::Result;

/// Boxed future returned by [`Gateway`] operations.
pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Remote operations the relay pipeline depends on.
pub trait Gateway: Send + Sync {
    /// Search `chat` for messages matching `query`, returning at most
    /// `limit` results in backend relevance order. An empty result is not
    /// an error.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Telegram`](crate::AppError::Telegram) on transport
    /// or backend failure.
    fn search_messages<'a>(
        &'a self,
        chat: &'a ChatRef,
        query: &'a str,
        limit: usize,
    ) -> GatewayFuture<'a, Vec<Message>>;

    /// Republish `message_id` from `source` into `target`, returning the new
    /// message.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Telegram`](crate::AppError::Telegram) if the copy
    /// is rejected or the transport fails.
    fn copy_message(
        &self,
        target: ChatId,
        source: ChatId,
        message_id: MessageId,
    ) -> GatewayFuture<'_, Message>;

    /// Delete `message_ids` from `chat` in one request.
    ///
    /// Deleting a message that is already gone must not be reported as a
    /// transport failure by implementations that can tell the difference.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Telegram`](crate::AppError::Telegram) when the
    /// backend refuses the deletion (e.g. missing admin rights).
    fn delete_messages<'a>(
        &'a self,
        chat: ChatId,
        message_ids: &'a [MessageId],
    ) -> GatewayFuture<'a, ()>;
}
