//! Update executor
//!
//! Performs one update attempt:
//!
//! 1. Resolve the current public IP via the [`IpResolver`]
//! 2. Skip when the IP equals the previous non-error result (unless forced)
//! 3. Otherwise push the IP to the record via the [`RecordClient`]
//! 4. Classify the outcome as success, skipped or one of three error kinds
//!
//! There are no retries in here; the scheduler decides when to try again.

use crate::activity::ActivityLog;
use crate::config::RecordTarget;
use crate::traits::{ApiResponse, IpResolver, RecordClient, RecordUpdate};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::sync::Arc;

/// Status of an update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateStatus {
    Success,
    Skipped,
    Error,
}

/// Failure class of an update attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateErrorKind {
    /// The record API could not be reached, or the resolver failed at transport level
    Network,
    /// The provider answered but rejected the update
    Api,
    /// The resolver answered without a valid address
    Lookup,
}

/// Outcome of one update attempt
///
/// The error kind exists exactly when the status is `error`, which the enum
/// shape enforces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UpdateResult {
    Success {
        ip: Ipv4Addr,
        #[serde(rename = "apiResponse")]
        api_response: ApiResponse,
    },
    Skipped {
        ip: Ipv4Addr,
    },
    Error {
        error: UpdateErrorKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        ip: Option<Ipv4Addr>,
        #[serde(
            rename = "apiResponse",
            default,
            skip_serializing_if = "Option::is_none"
        )]
        api_response: Option<ApiResponse>,
    },
}

impl UpdateResult {
    pub fn status(&self) -> UpdateStatus {
        match self {
            Self::Success { .. } => UpdateStatus::Success,
            Self::Skipped { .. } => UpdateStatus::Skipped,
            Self::Error { .. } => UpdateStatus::Error,
        }
    }

    pub fn error_kind(&self) -> Option<UpdateErrorKind> {
        match self {
            Self::Error { error, .. } => Some(*error),
            _ => None,
        }
    }

    /// The IP observed during the attempt, if the lookup got that far
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            Self::Success { ip, .. } | Self::Skipped { ip } => Some(*ip),
            Self::Error { ip, .. } => *ip,
        }
    }

    pub fn api_response(&self) -> Option<&ApiResponse> {
        match self {
            Self::Success { api_response, .. } => Some(api_response),
            Self::Error { api_response, .. } => api_response.as_ref(),
            Self::Skipped { .. } => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    fn failed(error: UpdateErrorKind, ip: Option<Ipv4Addr>, api_response: Option<ApiResponse>) -> Self {
        Self::Error {
            error,
            ip,
            api_response,
        }
    }
}

/// Runs single update attempts against one record
pub struct UpdateExecutor {
    resolver: Arc<dyn IpResolver>,
    client: Arc<dyn RecordClient>,
    target: RecordTarget,
    log: ActivityLog,
}

impl UpdateExecutor {
    pub fn new(
        resolver: Arc<dyn IpResolver>,
        client: Arc<dyn RecordClient>,
        target: RecordTarget,
        log: ActivityLog,
    ) -> Self {
        Self {
            resolver,
            client,
            target,
            log,
        }
    }

    pub fn target(&self) -> &RecordTarget {
        &self.target
    }

    /// Perform one attempt
    ///
    /// # Parameters
    ///
    /// - `force_update`: push the IP even when it matches the previous result
    /// - `previous`: the last committed result, used for the unchanged-IP check
    pub async fn execute(&self, force_update: bool, previous: Option<&UpdateResult>) -> UpdateResult {
        self.log.info("Updating record...");

        let ip = match self.resolver.lookup().await {
            Ok(ip) => ip,
            Err(e) => {
                let kind = if e.is_network() {
                    UpdateErrorKind::Network
                } else {
                    UpdateErrorKind::Lookup
                };
                self.log
                    .error(format!("IP lookup via {} failed: {}", self.resolver.name(), e));
                return UpdateResult::failed(kind, None, None);
            }
        };

        self.log.info(format!("New IP: {}.", ip));

        let previous_ip = previous.and_then(UpdateResult::ip);
        if previous_ip == Some(ip) {
            self.log.info("The IP is not changed from the last update.");
        }

        let unchanged = previous.is_some_and(|p| !p.is_error()) && previous_ip == Some(ip);
        if !force_update && unchanged {
            self.log.info("Update skipped.");
            return UpdateResult::Skipped { ip };
        }

        let update = RecordUpdate::a_record(&self.target.name, ip);
        let response = match self
            .client
            .update_record(&self.target.zone_id, &self.target.record_id, &update)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                self.log.error(format!(
                    "Connection error reaching {}: {}",
                    self.client.provider_name(),
                    e
                ));
                return UpdateResult::failed(UpdateErrorKind::Network, Some(ip), None);
            }
        };

        if response.success {
            self.log.info("Record updated successfully.");
            return UpdateResult::Success {
                ip,
                api_response: response,
            };
        }

        self.log.error(
            "Record update failed. Check the last response for more details about the error.",
        );
        UpdateResult::failed(UpdateErrorKind::Api, Some(ip), Some(response))
    }
}
