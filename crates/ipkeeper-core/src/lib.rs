// # ipkeeper-core
//
// Core library of the self-healing DNS A-record updater.
//
// ## Architecture Overview
//
// - **DelayedTask**: Cancellable, single-shot deferred work with exactly one outcome
// - **UpdateExecutor**: One attempt: resolve the IP, skip if unchanged, push to the record
// - **RetryPolicy**: Pure mapping from an attempt's outcome to the next delay or a stop
// - **UpdateService**: Scheduler owning the active task, the counters and the status
// - **ActivityLog**: Bounded history of service messages, mirrored to `tracing`
//
// Collaborators are traits (`IpResolver`, `RecordClient`, `Alerter`) implemented
// by the sibling crates; nothing in here performs network I/O itself.

pub mod activity;
pub mod config;
pub mod error;
pub mod executor;
pub mod retry;
pub mod service;
pub mod task;
pub mod traits;

// Re-export core types for convenience
pub use activity::{ActivityLog, LogEntry, LogLevel};
pub use config::{RecordTarget, RetryConfig, ServiceConfig};
pub use error::{Error, Result};
pub use executor::{UpdateErrorKind, UpdateExecutor, UpdateResult, UpdateStatus};
pub use retry::{ErrorCounters, RetryDecision, RetryPolicy};
pub use service::{ServiceSnapshot, ServiceStatus, UpdateService};
pub use task::{DelayedTask, TaskOutcome, TaskStatus};
pub use traits::{Alerter, ApiMessage, ApiResponse, IpResolver, LogAlerter, RecordClient, RecordUpdate};
