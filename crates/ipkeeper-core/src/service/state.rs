//! Service state and its read-only snapshot

use crate::activity::LogEntry;
use crate::executor::UpdateResult;
use crate::retry::ErrorCounters;
use crate::task::{DelayedTask, TaskStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle status of the update service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    /// Constructed, never started
    Ready,
    /// Scheduling update attempts
    Running,
    /// Stopped by an operator or by repeated API errors
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Running => "running",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The task owning the scheduling loop, tagged with its launch generation
pub(crate) struct ActiveTask {
    pub generation: u64,
    pub task: DelayedTask<UpdateResult>,
}

/// Mutable state of one update service
///
/// Only mutated while holding the service lock.
pub(crate) struct ServiceState {
    pub status: ServiceStatus,
    pub last_result: Option<UpdateResult>,
    pub last_update_skipped: bool,
    pub last_successful_update: Option<DateTime<Utc>>,
    pub counters: ErrorCounters,
    pub active: Option<ActiveTask>,
    pub generation: u64,
}

impl ServiceState {
    pub fn new() -> Self {
        Self {
            status: ServiceStatus::Ready,
            last_result: None,
            last_update_skipped: false,
            last_successful_update: None,
            counters: ErrorCounters::default(),
            active: None,
            generation: 0,
        }
    }

    /// Whether the task launched as `generation` may still commit its result
    pub fn owns(&self, generation: u64) -> bool {
        self.status == ServiceStatus::Running
            && self
                .active
                .as_ref()
                .is_some_and(|active| active.generation == generation)
    }

    /// Cancel and drop the active task, if any
    pub fn clear_active(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.cancel();
        }
    }

    /// Last-result bookkeeping shared by scheduled and out-of-band attempts
    pub fn record_result(&mut self, result: &UpdateResult) {
        self.last_update_skipped = matches!(result, UpdateResult::Skipped { .. });
        if matches!(result, UpdateResult::Success { .. }) {
            self.last_successful_update = Some(Utc::now());
        }
        self.last_result = Some(result.clone());
    }

    /// Time until the next scheduled attempt, while one is waiting
    pub fn next_update_in(&self) -> Option<Duration> {
        self.active
            .as_ref()
            .filter(|active| active.task.status() == TaskStatus::Pending)
            .map(|active| active.task.time_left())
    }
}

/// Read-only view of the service, as served by the status endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceSnapshot {
    pub status: ServiceStatus,
    pub last_result: Option<UpdateResult>,
    pub last_update_skipped: bool,
    pub last_successful_update_date: Option<DateTime<Utc>>,
    pub log_history: Vec<LogEntry>,
    /// `"<n> min"` until the next scheduled attempt, `"-"` when none is waiting
    pub next_update_in: String,
}

/// Render a wait as whole minutes, rounded to the nearest one
pub(crate) fn format_minutes(delay: Duration) -> String {
    format!("{} min", (delay.as_secs() + 30) / 60)
}

pub(crate) fn format_next_update(delay: Option<Duration>) -> String {
    delay.map_or_else(|| "-".to_string(), format_minutes)
}
