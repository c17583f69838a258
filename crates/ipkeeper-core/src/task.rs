//! Delayed task
//!
//! A cancellable, single-shot unit of deferred work. After its delay elapses
//! the work runs exactly once, unless [`DelayedTask::cancel`] got there first.
//!
//! ## Status transitions
//!
//! ```text
//!             fire                 work done
//! Pending ─────────────▶ Running ─────────────▶ Executed | Error
//!    │
//!    └───── cancel ────▶ Canceled
//! ```
//!
//! Firing and cancelling race for the `Pending` state under one lock; the
//! loser observes a no-op. Terminal states never change again, and the
//! result channel is completed exactly once.

use crate::error::Error;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Observable status of a delayed task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    /// Waiting for the delay to elapse
    Pending,
    /// Delay elapsed, work in flight (can no longer be canceled)
    Running,
    /// Work completed successfully
    Executed,
    /// Canceled before firing
    Canceled,
    /// Work failed
    Error,
}

impl TaskStatus {
    /// Whether the status can no longer change
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Executed | Self::Canceled | Self::Error)
    }
}

/// Final outcome of a delayed task
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    Executed(T),
    Canceled,
    Error(String),
}

impl<T> TaskOutcome<T> {
    /// The terminal status matching this outcome
    pub fn status(&self) -> TaskStatus {
        match self {
            Self::Executed(_) => TaskStatus::Executed,
            Self::Canceled => TaskStatus::Canceled,
            Self::Error(_) => TaskStatus::Error,
        }
    }

    /// The produced value, if the work ran to completion
    pub fn into_executed(self) -> Option<T> {
        match self {
            Self::Executed(value) => Some(value),
            _ => None,
        }
    }
}

struct Shared<T> {
    status: Mutex<TaskStatus>,
    outcome: watch::Sender<Option<TaskOutcome<T>>>,
    cancel: CancellationToken,
}

impl<T> Shared<T> {
    fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move from `from` to `to`; false if the task is no longer in `from`
    fn transition(&self, from: TaskStatus, to: TaskStatus) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status != from {
            return false;
        }
        *status = to;
        true
    }

    fn complete(&self, outcome: TaskOutcome<T>) {
        self.outcome.send_replace(Some(outcome));
    }
}

/// Handle to a scheduled unit of work
///
/// Handles are cheap to clone; every clone observes the same status and
/// outcome. Dropping handles does not cancel the task.
pub struct DelayedTask<T> {
    shared: Arc<Shared<T>>,
    created: Instant,
    delay: Duration,
}

impl<T> Clone for DelayedTask<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            created: self.created,
            delay: self.delay,
        }
    }
}

impl<T> std::fmt::Debug for DelayedTask<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DelayedTask")
            .field("status", &self.shared.status())
            .field("delay", &self.delay)
            .finish()
    }
}

impl<T> DelayedTask<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Schedule `work` to run once `delay` has elapsed
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<F, Fut>(delay: Duration, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        let (outcome, _) = watch::channel(None);
        let shared = Arc::new(Shared {
            status: Mutex::new(TaskStatus::Pending),
            outcome,
            cancel: CancellationToken::new(),
        });

        let timer = Arc::clone(&shared);
        tokio::spawn(async move {
            tokio::select! {
                _ = timer.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            if !timer.transition(TaskStatus::Pending, TaskStatus::Running) {
                return;
            }

            // Run the work on its own task so a panic becomes an `Error` outcome
            // instead of leaving the result channel open forever.
            let outcome = match tokio::spawn(work()).await {
                Ok(Ok(value)) => TaskOutcome::Executed(value),
                Ok(Err(e)) => TaskOutcome::Error(e.to_string()),
                Err(e) => TaskOutcome::Error(format!("work aborted: {}", e)),
            };

            timer.transition(TaskStatus::Running, outcome.status());
            timer.complete(outcome);
        });

        Self {
            shared,
            created: Instant::now(),
            delay,
        }
    }

    /// Schedule `work` for an absolute deadline (a past deadline fires immediately)
    pub fn at<F, Fut>(deadline: Instant, work: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, Error>> + Send + 'static,
    {
        Self::new(deadline.saturating_duration_since(Instant::now()), work)
    }

    /// Wait for the single outcome of this task
    pub async fn result(&self) -> TaskOutcome<T> {
        let mut rx = self.shared.outcome.subscribe();
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| TaskOutcome::Error("task result channel closed".to_string()))
    }
}

impl<T> DelayedTask<T> {
    /// Cancel the task if it has not fired yet
    ///
    /// Returns `true` if this call canceled the task, `false` if it was a no-op.
    pub fn cancel(&self) -> bool {
        if !self
            .shared
            .transition(TaskStatus::Pending, TaskStatus::Canceled)
        {
            return false;
        }

        self.shared.cancel.cancel();
        self.shared.complete(TaskOutcome::Canceled);
        debug!("Delayed task canceled with {:?} left", self.remaining());
        true
    }

    pub fn status(&self) -> TaskStatus {
        self.shared.status()
    }

    /// Time until the task fires; zero once it fired or was canceled
    pub fn time_left(&self) -> Duration {
        if self.status() != TaskStatus::Pending {
            return Duration::ZERO;
        }
        self.remaining()
    }

    /// The configured delay
    pub fn delay(&self) -> Duration {
        self.delay
    }

    fn remaining(&self) -> Duration {
        self.delay.saturating_sub(self.created.elapsed())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_task(delay: Duration, runs: Arc<AtomicUsize>) -> DelayedTask<u32> {
        DelayedTask::new(delay, move || async move {
            runs.fetch_add(1, Ordering::SeqCst);
            Ok(42)
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::from_secs(5), Arc::clone(&runs));

        assert_eq!(task.status(), TaskStatus::Pending);
        assert_eq!(task.time_left(), Duration::from_secs(5));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(task.time_left(), Duration::from_secs(3));
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        assert_eq!(task.result().await, TaskOutcome::Executed(42));
        assert_eq!(task.status(), TaskStatus::Executed);
        assert_eq!(task.time_left(), Duration::ZERO);

        // Cancel after firing is a no-op
        assert!(!task.cancel());
        assert_eq!(task.status(), TaskStatus::Executed);
        assert_eq!(task.result().await, TaskOutcome::Executed(42));
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_firing_wins() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::from_secs(10), Arc::clone(&runs));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(task.cancel());
        assert!(!task.cancel());

        assert_eq!(task.result().await, TaskOutcome::Canceled);
        assert_eq!(task.time_left(), Duration::ZERO);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(task.status(), TaskStatus::Canceled);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_delay_can_be_canceled_before_it_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::ZERO, Arc::clone(&runs));

        // Nothing has yielded to the runtime yet, so the timer has not fired.
        assert!(task.cancel());
        assert_eq!(task.result().await, TaskOutcome::Canceled);

        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_result_is_pending_until_fired() {
        let task = counting_task(Duration::from_secs(1), Arc::new(AtomicUsize::new(0)));

        let mut result = tokio_test::task::spawn(task.result());
        tokio_test::assert_pending!(result.poll());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(result.is_woken());
        tokio_test::assert_ready_eq!(result.poll(), TaskOutcome::Executed(42));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_running_is_a_no_op() {
        let task = DelayedTask::new(Duration::ZERO, || async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok("done")
        });

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(task.status(), TaskStatus::Running);
        assert!(!task.cancel());

        assert_eq!(task.result().await, TaskOutcome::Executed("done"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_failure_surfaces_as_error() {
        let task: DelayedTask<u32> = DelayedTask::new(Duration::from_secs(1), || async {
            Err(Error::Other("boom".to_string()))
        });

        match task.result().await {
            TaskOutcome::Error(message) => assert!(message.contains("boom")),
            other => panic!("expected error outcome, got {:?}", other),
        }
        assert_eq!(task.status(), TaskStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_work_panic_surfaces_as_error() {
        let task: DelayedTask<u32> = DelayedTask::new(Duration::ZERO, || async {
            panic!("work exploded");
        });

        assert!(matches!(task.result().await, TaskOutcome::Error(_)));
        assert_eq!(task.status(), TaskStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clones_observe_the_same_outcome() {
        let runs = Arc::new(AtomicUsize::new(0));
        let task = counting_task(Duration::from_secs(1), Arc::clone(&runs));
        let clone = task.clone();

        let (a, b) = tokio::join!(task.result(), clone.result());
        assert_eq!(a, b);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_past_deadline_fires_immediately() {
        let deadline = Instant::now();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let task = DelayedTask::at(deadline, || async { Ok(7u8) });
        assert_eq!(task.delay(), Duration::ZERO);
        assert_eq!(task.result().await, TaskOutcome::Executed(7));
    }
}
