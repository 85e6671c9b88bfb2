//! Deferred deletion of relayed message pairs.
//!
//! Every successful relay gets its own detached task that sleeps until the
//! grace period has elapsed and then deletes the trigger and its copy in a
//! single batched request. Tasks share nothing but the gateway handle, so
//! any number of them can be pending at once without touching the dispatch
//! loop. There is no retry and no cancellation: a task either completes its
//! single deletion attempt or dies with the process.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, Instrument};

use crate::gateway::Gateway;
use crate::models::{CleanupState, CleanupTask, RelayResult};

/// Stand-in deadline for delays too large to represent.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Spawns one timed deletion task per relay.
#[derive(Clone)]
pub struct CleanupScheduler {
    gateway: Arc<dyn Gateway>,
    delay: Duration,
    tracker: TaskTracker,
}

impl CleanupScheduler {
    /// Create a scheduler whose tasks fire `delay` after scheduling.
    #[must_use]
    pub fn new(gateway: Arc<dyn Gateway>, delay: Duration) -> Self {
        Self {
            gateway,
            delay,
            tracker: TaskTracker::new(),
        }
    }

    /// Number of tasks that have not yet finished their deletion attempt.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Start the cleanup for `result` and return immediately.
    ///
    /// The returned [`CleanupTask`] is a snapshot for logging and
    /// inspection; the running task owns its own copy.
    pub fn schedule(&self, result: RelayResult) -> CleanupTask {
        let now = Instant::now();
        let deadline = now.checked_add(self.delay).unwrap_or(now + FAR_FUTURE);
        let task = CleanupTask::new(&result, self.delay);

        info!(
            task_id = %task.task_id,
            chat_id = %task.chat_id,
            message_ids = ?task.message_ids,
            delay_seconds = self.delay.as_secs(),
            due_at = %task.due_at,
            "cleanup scheduled"
        );

        let span = info_span!("cleanup_task", task_id = %task.task_id);
        self.tracker.spawn(
            run_cleanup(Arc::clone(&self.gateway), task.clone(), deadline).instrument(span),
        );

        task
    }
}

async fn run_cleanup(
    gateway: Arc<dyn Gateway>,
    task: CleanupTask,
    deadline: Instant,
) -> CleanupState {
    let mut state = CleanupState::Pending;
    debug!(?state, "waiting for grace period");

    tokio::time::sleep_until(deadline).await;
    state = CleanupState::Due;
    debug!(?state, "grace period elapsed");

    match gateway
        .delete_messages(task.chat_id, &task.message_ids)
        .await
    {
        Ok(()) => {
            info!(
                chat_id = %task.chat_id,
                message_ids = ?task.message_ids,
                "relayed messages deleted"
            );
        }
        Err(err) => {
            // Missing rights or already-deleted messages land here; both are
            // final for this task.
            error!(
                chat_id = %task.chat_id,
                message_ids = ?task.message_ids,
                %err,
                "failed to delete relayed messages"
            );
        }
    }

    state = CleanupState::Completed;
    debug!(?state, "cleanup finished");
    state
}
