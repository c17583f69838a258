// # Record Client Trait
//
// Defines the interface for applying a content update to one DNS record
// through a provider API.
//
// ## Implementations
//
// - Cloudflare: `ipkeeper-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use ipkeeper_core::traits::{RecordClient, RecordUpdate};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let client = /* RecordClient implementation */;
//
//     let update = RecordUpdate::a_record("home.example.com", "203.0.113.7".parse()?);
//     let response = client.update_record("zone-id", "record-id", &update).await?;
//     println!("accepted: {}", response.success);
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Request body for a record update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    /// New record content (the IPv4 address in dotted form)
    pub content: String,
    /// Fully qualified record name
    pub name: String,
    /// Record type, always "A" here
    #[serde(rename = "type")]
    pub record_type: String,
}

impl RecordUpdate {
    /// Build the body for an A record pointing at `ip`
    pub fn a_record(name: impl Into<String>, ip: Ipv4Addr) -> Self {
        Self {
            content: ip.to_string(),
            name: name.into(),
            record_type: "A".to_string(),
        }
    }
}

/// A code/message pair reported by the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiMessage {
    pub code: i64,
    pub message: String,
}

/// Structured provider response
///
/// The response is kept verbatim so it can be surfaced through the status
/// endpoint and attached to alerts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Whether the provider accepted the update
    pub success: bool,
    /// The record as the provider now stores it (provider-specific shape)
    #[serde(default)]
    pub result: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    #[serde(default)]
    pub messages: Vec<ApiMessage>,
}

/// Trait for DNS record API clients
///
/// Clients are **single-shot**: one call, one request. They hold their
/// credentials from construction, so an unconfigured client cannot exist.
///
/// # Error classification
///
/// - A response the provider produced (even with `success = false`) is
///   returned as `Ok(ApiResponse)`; the executor turns a rejected update
///   into an `api` error.
/// - Transport failures and bodies that cannot be parsed are returned as
///   `Err(Error::Network)`.
#[async_trait]
pub trait RecordClient: Send + Sync {
    /// Apply `update` to the record `record_id` in zone `zone_id`
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<ApiResponse, crate::Error>;

    /// Provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
