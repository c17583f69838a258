//! Collaborator traits
//!
//! This module defines the interfaces the scheduler consumes.
//!
//! - [`IpResolver`]: Discover the current public IPv4 address
//! - [`RecordClient`]: Apply an update to a DNS record via a provider API
//! - [`Alerter`]: Deliver best-effort alerts

pub mod alerter;
pub mod ip_resolver;
pub mod record_client;

pub use alerter::{Alerter, LogAlerter};
pub use ip_resolver::IpResolver;
pub use record_client::{ApiMessage, ApiResponse, RecordClient, RecordUpdate};
