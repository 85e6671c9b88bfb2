//! `getUpdates` long-polling loop.
//!
//! Group messages are forwarded to the dispatch channel as
//! [`IncomingEvent`]s; posts from the source chat feed the search index.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::TelegramGateway;
use super::index::ChannelIndex;
use super::types::{TelegramMessage, Update};
use crate::models::{ChatId, ChatRef, IncomingEvent, MessageId};

const INITIAL_RETRY_DELAY: Duration = Duration::from_secs(1);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Route one update: index source posts, return group messages as events.
///
/// The source may be a channel (`channel_post`) or a supergroup
/// (`message`); either way its posts go to the index and never to the
/// dispatch queue. Edited group messages are not re-dispatched.
#[must_use]
pub fn route_update(
    update: Update,
    source: &ChatRef,
    index: &ChannelIndex,
) -> Option<IncomingEvent> {
    if let Some(message) = update.message {
        if is_source(&message, source) {
            index_post(&message, index);
            return None;
        }
        return Some(message.to_incoming_event());
    }

    let post = update
        .channel_post
        .or(update.edited_channel_post)
        .or(update.edited_message)?;
    if is_source(&post, source) {
        index_post(&post, index);
    } else {
        debug!(chat_id = post.chat.id, kind = %post.chat.kind, "update from unrelated chat ignored");
    }

    None
}

fn is_source(message: &TelegramMessage, source: &ChatRef) -> bool {
    source.matches(ChatId(message.chat.id), message.chat.username.as_deref())
}

fn index_post(post: &TelegramMessage, index: &ChannelIndex) {
    match post.searchable_text() {
        Some(text) => {
            index.upsert(ChatId(post.chat.id), MessageId(post.message_id), text);
            debug!(message_id = post.message_id, kind = %post.chat.kind, "source post indexed");
        }
        // An edit that strips the caption makes the post unsearchable.
        None => index.remove(MessageId(post.message_id)),
    }
}

/// Spawn the polling loop.
///
/// The loop stops when `cancel` fires or the event receiver is dropped.
/// Poll failures back off exponentially up to 30 seconds.
#[must_use]
pub fn spawn_update_poller(
    gateway: Arc<TelegramGateway>,
    events: mpsc::Sender<IncomingEvent>,
    polling_timeout_seconds: u32,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut offset: i64 = 0;
        let mut backoff = INITIAL_RETRY_DELAY;

        loop {
            let batch = tokio::select! {
                () = cancel.cancelled() => break,
                batch = gateway.get_updates(offset, polling_timeout_seconds) => batch,
            };

            let updates = match batch {
                Ok(updates) => {
                    backoff = INITIAL_RETRY_DELAY;
                    updates
                }
                Err(err) => {
                    warn!(%err, delay = ?backoff, "telegram poll failed; retrying");
                    tokio::select! {
                        () = cancel.cancelled() => break,
                        () = sleep(backoff) => {}
                    }
                    backoff = (backoff * 2).min(MAX_RETRY_DELAY);
                    continue;
                }
            };

            for update in updates {
                offset = offset.max(update.update_id + 1);
                let Some(event) = route_update(update, gateway.source(), gateway.index()) else {
                    continue;
                };
                if events.send(event).await.is_err() {
                    info!("event receiver dropped; telegram poller exiting");
                    return;
                }
            }
        }
        info!("telegram poller shutting down");
    })
}
