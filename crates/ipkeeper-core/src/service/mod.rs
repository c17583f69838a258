//! Update service
//!
//! The self-healing scheduler. It owns at most one active [`DelayedTask`],
//! sequences update attempts through the [`RetryPolicy`], and exposes the
//! operator controls (start, stop, manual updates) plus a status snapshot.
//!
//! ## State machine
//!
//! ```text
//!          start                stop / repeated API errors
//! Ready ─────────▶ Running ───────────────────────────────▶ Stopped
//!                     ▲                                        │
//!                     └──────────────── start ─────────────────┘
//! ```
//!
//! ## Ownership of the schedule
//!
//! Every launched task gets a fresh generation number and is stored in the
//! active slot. When its attempt finishes, it commits the result only if it
//! still owns the slot and the service is still running. A task that was
//! replaced by a manual update, or that was already in flight when the service
//! stopped, has its result discarded.
//!
//! All state lives behind one `std::sync::Mutex` that is never held across an
//! `.await`. The stop hook is invoked after the lock is released.

mod state;

pub use state::{ServiceSnapshot, ServiceStatus};

use crate::activity::ActivityLog;
use crate::config::ServiceConfig;
use crate::error::{Error, Result};
use crate::executor::{UpdateExecutor, UpdateResult};
use crate::retry::{ErrorCounters, RetryDecision, RetryPolicy};
use crate::task::DelayedTask;
use crate::traits::{IpResolver, RecordClient};
use state::{ActiveTask, ServiceState, format_minutes, format_next_update};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::debug;

type StopHook = Arc<dyn Fn(bool) + Send + Sync>;

struct Inner {
    executor: UpdateExecutor,
    policy: RetryPolicy,
    log: ActivityLog,
    state: Mutex<ServiceState>,
    stop_hook: Mutex<Option<StopHook>>,
}

/// Handle to the update service
///
/// Cloning the handle shares the service.
#[derive(Clone)]
pub struct UpdateService {
    inner: Arc<Inner>,
}

impl UpdateService {
    /// Create a service in the `ready` state
    ///
    /// # Parameters
    ///
    /// - `config`: validated before use
    /// - `resolver`: public IP discovery
    /// - `client`: record API client
    ///
    /// # Returns
    ///
    /// - `Ok(UpdateService)`: Nothing is scheduled until [`UpdateService::start`]
    /// - `Err(Error::Config)`: Invalid configuration
    pub fn new(
        config: &ServiceConfig,
        resolver: Arc<dyn IpResolver>,
        client: Arc<dyn RecordClient>,
    ) -> Result<Self> {
        config.validate()?;

        let log = ActivityLog::with_capacity(config.log_capacity);
        let executor = UpdateExecutor::new(resolver, client, config.record.clone(), log.clone());

        Ok(Self {
            inner: Arc::new(Inner {
                executor,
                policy: RetryPolicy::from(&config.retry),
                log,
                state: Mutex::new(ServiceState::new()),
                stop_hook: Mutex::new(None),
            }),
        })
    }

    /// Start scheduling; the first attempt fires immediately
    ///
    /// Resets the error counters. Returns `false` if the service was already running.
    pub fn start(&self) -> bool {
        let mut state = self.state();
        if state.status == ServiceStatus::Running {
            return false;
        }

        state.status = ServiceStatus::Running;
        state.counters = ErrorCounters::default();
        self.inner.log.info("Service started.");
        self.launch(&mut state, Duration::ZERO, false);
        true
    }

    /// Stop scheduling and notify the stop hook with `false`
    ///
    /// Returns `false` if the service was not running.
    pub fn stop(&self) -> bool {
        {
            let mut state = self.state();
            if state.status != ServiceStatus::Running {
                return false;
            }

            state.clear_active();
            state.status = ServiceStatus::Stopped;
            self.inner.log.info("Service stopped.");
        }

        self.notify_stop(false);
        true
    }

    /// Replace the pending attempt with an immediate one and wait for its result
    ///
    /// The scheduling loop continues from the new attempt.
    ///
    /// # Returns
    ///
    /// - `Some(result)`: The attempt ran
    /// - `None`: The service is not running, or the attempt was superseded
    ///   before it could run
    pub async fn update_sync(&self, force_update: bool) -> Option<UpdateResult> {
        let task = {
            let mut state = self.state();
            if state.status != ServiceStatus::Running {
                return None;
            }

            self.inner.log.info("Manual update (sync).");
            state.clear_active();
            self.launch(&mut state, Duration::ZERO, force_update)
        };

        task.result().await.into_executed()
    }

    /// Run one attempt out of band
    ///
    /// Works in any status. Updates the last-result fields but leaves the
    /// schedule and the error counters alone.
    pub async fn update_async(&self, force_update: bool) -> UpdateResult {
        self.inner.log.info("Manual update (async).");

        let previous = self.state().last_result.clone();
        let result = self
            .inner
            .executor
            .execute(force_update, previous.as_ref())
            .await;

        self.state().record_result(&result);
        result
    }

    /// Snapshot of the service for the status endpoint
    pub fn service_data(&self) -> ServiceSnapshot {
        let state = self.state();
        ServiceSnapshot {
            status: state.status,
            last_result: state.last_result.clone(),
            last_update_skipped: state.last_update_skipped,
            last_successful_update_date: state.last_successful_update,
            log_history: self.inner.log.entries(),
            next_update_in: format_next_update(state.next_update_in()),
        }
    }

    /// Register the stop hook, replacing any previous one
    ///
    /// The hook receives `true` when repeated API errors stopped the service
    /// and `false` on an explicit [`UpdateService::stop`].
    pub fn on_stop<F>(&self, hook: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        *self
            .inner
            .stop_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(hook));
    }

    pub fn status(&self) -> ServiceStatus {
        self.state().status
    }

    pub fn last_result(&self) -> Option<UpdateResult> {
        self.state().last_result.clone()
    }

    pub fn error_counters(&self) -> ErrorCounters {
        self.state().counters
    }

    /// Time until the next scheduled attempt, while one is waiting
    pub fn next_update_in(&self) -> Option<Duration> {
        self.state().next_update_in()
    }

    pub fn activity_log(&self) -> &ActivityLog {
        &self.inner.log
    }

    fn state(&self) -> MutexGuard<'_, ServiceState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Put a new task into the active slot
    ///
    /// The caller holds the lock and has already cleared the previous task.
    fn launch(
        &self,
        state: &mut ServiceState,
        delay: Duration,
        force_update: bool,
    ) -> DelayedTask<UpdateResult> {
        state.generation += 1;
        let generation = state.generation;

        if !delay.is_zero() {
            self.inner
                .log
                .info(format!("Next record update in {}.", format_minutes(delay)));
        }

        let service = self.clone();
        let task = DelayedTask::new(delay, move || async move {
            service.run_scheduled(generation, force_update).await
        });

        state.active = Some(ActiveTask {
            generation,
            task: task.clone(),
        });
        task
    }

    async fn run_scheduled(self, generation: u64, force_update: bool) -> Result<UpdateResult> {
        let previous = {
            let state = self.state();
            if !state.owns(generation) {
                return Err(Error::task("superseded before the attempt started"));
            }
            state.last_result.clone()
        };

        let result = self
            .inner
            .executor
            .execute(force_update, previous.as_ref())
            .await;

        self.commit(generation, &result);
        Ok(result)
    }

    /// Apply the retry policy to a finished scheduled attempt
    fn commit(&self, generation: u64, result: &UpdateResult) {
        let stopped = {
            let mut state = self.state();
            if !state.owns(generation) {
                debug!(generation, "Discarding result of a superseded update");
                return;
            }

            state.record_result(result);
            let (counters, decision) = self.inner.policy.evaluate(result, state.counters);
            state.counters = counters;

            match decision {
                RetryDecision::After(delay) => {
                    if result.is_error() {
                        self.log_retry(counters, delay);
                    }
                    self.launch(&mut state, delay, false);
                    false
                }
                RetryDecision::Stop => {
                    state.active = None;
                    state.status = ServiceStatus::Stopped;
                    self.inner.log.error("Repeated API errors.");
                    self.inner.log.info("Service stopped.");
                    true
                }
            }
        };

        if stopped {
            self.notify_stop(true);
        }
    }

    fn log_retry(&self, counters: ErrorCounters, delay: Duration) {
        if counters.network > 1 {
            self.inner.log.warn("Possible network problem.");
        }
        if delay.is_zero() {
            self.inner.log.info("Retry");
        } else {
            self.inner
                .log
                .info(format!("Retry in {}.", format_minutes(delay)));
        }
    }

    fn notify_stop(&self, unexpected: bool) {
        let hook = self
            .inner
            .stop_hook
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        if let Some(hook) = hook {
            hook(unexpected);
        }
    }
}

impl std::fmt::Debug for UpdateService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpdateService")
            .field("status", &self.status())
            .field("record", &self.inner.executor.target().name)
            .finish()
    }
}
