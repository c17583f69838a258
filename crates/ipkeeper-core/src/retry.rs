//! Retry policy
//!
//! Maps the result of an attempt and the consecutive-error counters to the
//! delay before the next attempt, or to a stop of the service.
//!
//! | result           | counters after         | next attempt                     |
//! |------------------|------------------------|----------------------------------|
//! | success, skipped | both reset             | `success_interval`               |
//! | network, lookup  | `network += 1`         | immediately, then `network_backoff` |
//! | api error        | `api += 1`             | `api_retry_delay`, or stop once `api > max_api_errors` |

use crate::executor::{UpdateErrorKind, UpdateResult};
use serde::Serialize;
use std::time::Duration;

/// Consecutive failure counters of the scheduler
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ErrorCounters {
    pub api: u32,
    pub network: u32,
}

/// What the scheduler does after an attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Schedule the next attempt after the given delay
    After(Duration),
    /// Stop the service
    Stop,
}

/// Timing constants of the self-healing loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    success_interval: Duration,
    api_retry_delay: Duration,
    max_api_errors: u32,
    network_backoff: Duration,
}

impl RetryPolicy {
    /// Delay after a success or a skip
    pub const DEFAULT_SUCCESS_INTERVAL: Duration = Duration::from_secs(10 * 60);
    /// Delay after a tolerated API error
    pub const DEFAULT_API_RETRY_DELAY: Duration = Duration::from_secs(2 * 60);
    /// API errors tolerated in a row; one more stops the service
    pub const DEFAULT_MAX_API_ERRORS: u32 = 2;
    /// Delay after the second and later connectivity errors in a row
    pub const DEFAULT_NETWORK_BACKOFF: Duration = Duration::from_secs(30 * 60);

    pub const fn new() -> Self {
        Self {
            success_interval: Self::DEFAULT_SUCCESS_INTERVAL,
            api_retry_delay: Self::DEFAULT_API_RETRY_DELAY,
            max_api_errors: Self::DEFAULT_MAX_API_ERRORS,
            network_backoff: Self::DEFAULT_NETWORK_BACKOFF,
        }
    }

    #[must_use]
    pub const fn with_success_interval(mut self, interval: Duration) -> Self {
        self.success_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_api_retry_delay(mut self, delay: Duration) -> Self {
        self.api_retry_delay = delay;
        self
    }

    #[must_use]
    pub const fn with_max_api_errors(mut self, max: u32) -> Self {
        self.max_api_errors = max;
        self
    }

    #[must_use]
    pub const fn with_network_backoff(mut self, backoff: Duration) -> Self {
        self.network_backoff = backoff;
        self
    }

    pub const fn success_interval(&self) -> Duration {
        self.success_interval
    }

    pub const fn api_retry_delay(&self) -> Duration {
        self.api_retry_delay
    }

    pub const fn max_api_errors(&self) -> u32 {
        self.max_api_errors
    }

    pub const fn network_backoff(&self) -> Duration {
        self.network_backoff
    }

    /// Decide the next step after `result`
    ///
    /// # Parameters
    ///
    /// - `result`: the outcome of the attempt that just finished
    /// - `counters`: the counters before that attempt
    ///
    /// # Returns
    ///
    /// The updated counters and the decision.
    pub fn evaluate(
        &self,
        result: &UpdateResult,
        counters: ErrorCounters,
    ) -> (ErrorCounters, RetryDecision) {
        match result.error_kind() {
            None => (
                ErrorCounters::default(),
                RetryDecision::After(self.success_interval),
            ),
            Some(UpdateErrorKind::Network | UpdateErrorKind::Lookup) => {
                let counters = ErrorCounters {
                    network: counters.network.saturating_add(1),
                    ..counters
                };
                let delay = if counters.network > 1 {
                    self.network_backoff
                } else {
                    Duration::ZERO
                };
                (counters, RetryDecision::After(delay))
            }
            Some(UpdateErrorKind::Api) => {
                let counters = ErrorCounters {
                    api: counters.api.saturating_add(1),
                    ..counters
                };
                if counters.api > self.max_api_errors {
                    (counters, RetryDecision::Stop)
                } else {
                    (counters, RetryDecision::After(self.api_retry_delay))
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new()
    }
}
