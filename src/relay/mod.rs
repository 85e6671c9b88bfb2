//! Relay pipeline: filter, resolve, copy, then schedule cleanup.
//!
//! Each inbound event runs through [`RelayPipeline::handle`] in its own
//! task. Within one event the stages are strictly sequential; across events
//! there is no ordering. Every failure is logged where it happens and stops
//! the pipeline for that event only. Nothing is ever posted back to the chat
//! on failure.

pub mod cleanup;
pub mod filter;
pub mod forwarder;
pub mod resolver;

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, Instrument};

use crate::config::GlobalConfig;
use crate::gateway::Gateway;
use crate::models::{CleanupTask, IncomingEvent};

pub use cleanup::CleanupScheduler;
pub use filter::InboundFilter;
pub use forwarder::RelayForwarder;
pub use resolver::MatchResolver;

/// The four relay stages wired together.
#[derive(Clone)]
pub struct RelayPipeline {
    filter: InboundFilter,
    resolver: MatchResolver,
    forwarder: RelayForwarder,
    cleanup: CleanupScheduler,
}

impl RelayPipeline {
    /// Assemble a pipeline from explicit stages.
    #[must_use]
    pub fn new(
        filter: InboundFilter,
        resolver: MatchResolver,
        forwarder: RelayForwarder,
        cleanup: CleanupScheduler,
    ) -> Self {
        Self {
            filter,
            resolver,
            forwarder,
            cleanup,
        }
    }

    /// Build a pipeline for `config` on top of `gateway`.
    #[must_use]
    pub fn from_config(config: &GlobalConfig, gateway: Arc<dyn Gateway>) -> Self {
        Self::new(
            InboundFilter::new(
                config.telegram.target_group_id,
                config.telegram.source_channel.clone(),
            ),
            MatchResolver::new(Arc::clone(&gateway)),
            RelayForwarder::new(Arc::clone(&gateway)),
            CleanupScheduler::new(gateway, config.cleanup_delay()),
        )
    }

    /// The cleanup stage, for in-flight accounting.
    #[must_use]
    pub fn cleanup(&self) -> &CleanupScheduler {
        &self.cleanup
    }

    /// Process one inbound event to completion of its synchronous stages.
    ///
    /// Returns the scheduled cleanup when a relay happened, `None` when the
    /// event was rejected, had no match, or a backend call failed. The
    /// cleanup itself runs detached and is not awaited here.
    pub async fn handle(&self, event: IncomingEvent) -> Option<CleanupTask> {
        let query = self.filter.accept(&event)?;

        info!(
            chat_id = %event.chat_id,
            message_id = %event.message_id,
            query = %query.query_text,
            "searching source channel"
        );

        let candidate = self.resolver.resolve(&query).await?;
        let result = self
            .forwarder
            .relay(&candidate, event.chat_id, event.message_id)
            .await?;

        Some(self.cleanup.schedule(result))
    }
}

/// Spawn the dispatch loop that hands each inbound event to its own task.
///
/// The loop exits when `cancel` fires or every sender is dropped. Handler
/// tasks and cleanup tasks already started are not waited for.
#[must_use]
pub fn spawn_dispatch(
    pipeline: Arc<RelayPipeline>,
    mut events: mpsc::Receiver<IncomingEvent>,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                () = cancel.cancelled() => {
                    info!("dispatch loop shutting down");
                    break;
                }
                event = events.recv() => {
                    let Some(event) = event else {
                        info!("event stream closed");
                        break;
                    };
                    let pipeline = Arc::clone(&pipeline);
                    let span = info_span!(
                        "relay",
                        chat_id = %event.chat_id,
                        message_id = %event.message_id,
                    );
                    tokio::spawn(
                        async move {
                            pipeline.handle(event).await;
                        }
                        .instrument(span),
                    );
                }
            }
        }
    })
}

/// Log a background loop that ended by panicking or being aborted.
///
/// Returns whether the task finished cleanly.
pub fn report_task_exit(task: &str, result: std::result::Result<(), JoinError>) -> bool {
    match result {
        Ok(()) => true,
        Err(err) => {
            error!(task, %err, panicked = err.is_panic(), "background task failed");
            false
        }
    }
}
