// # Cloudflare Record Client
//
// This crate provides the Cloudflare implementation of `RecordClient`.
//
// ## Behaviour
//
// - One PATCH per call, no retries (retry timing belongs to the scheduler)
// - 30 second HTTP timeout
// - Any JSON envelope Cloudflare returns is passed back verbatim, including
//   `success: false` answers on 4xx statuses; the executor classifies those
//   as API errors
// - Transport failures and bodies that are not a Cloudflare envelope are
//   reported as `Error::Network`
// - Dry-run mode logs the request instead of sending it
//
// ## Security
//
// - The API token never appears in logs or in `Debug` output
// - An empty token is rejected at construction
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Patch DNS Record: PATCH `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ipkeeper_core::traits::{ApiMessage, ApiResponse, RecordClient, RecordUpdate};
use ipkeeper_core::{Error, Result};
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Cloudflare DNS record client
///
/// Holds its API token from construction, so an unconfigured client
/// cannot exist.
pub struct CloudflareClient {
    /// Cloudflare API token
    /// ⚠️ NEVER log this value
    api_token: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: log the PATCH instead of sending it
    dry_run: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for CloudflareClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareClient")
            .field("api_token", &"<REDACTED>")
            .field("base_url", &self.base_url)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl CloudflareClient {
    /// Create a client in live mode
    ///
    /// # Parameters
    ///
    /// - `api_token`: Cloudflare API token with Zone:DNS:Edit permissions
    ///
    /// # Returns
    ///
    /// - `Ok(CloudflareClient)`: Ready to send updates
    /// - `Err(Error::Config)`: Empty token, or the HTTP client could not be built
    pub fn new(api_token: impl Into<String>) -> Result<Self> {
        let api_token = api_token.into();
        if api_token.trim().is_empty() {
            return Err(Error::config("Cloudflare API token cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_token,
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
            dry_run: false,
        })
    }

    /// Point the client at another API root (without trailing slash)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        if dry_run {
            tracing::warn!("Cloudflare client running in DRY-RUN mode - no changes will be made");
        }
        self.dry_run = dry_run;
        self
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn record_url(&self, zone_id: &str, record_id: &str) -> String {
        format!("{}/zones/{}/dns_records/{}", self.base_url, zone_id, record_id)
    }

    fn dry_run_response(update: &RecordUpdate) -> ApiResponse {
        ApiResponse {
            success: true,
            result: serde_json::to_value(update).ok(),
            errors: vec![],
            messages: vec![ApiMessage {
                code: 0,
                message: "dry-run: request not sent".to_string(),
            }],
        }
    }
}

#[async_trait]
impl RecordClient for CloudflareClient {
    /// Patch one DNS record
    ///
    /// # API Call
    ///
    /// ```http
    /// PATCH /zones/:zone_id/dns_records/:record_id
    /// Authorization: Bearer <token>
    ///
    /// {"content": "1.2.3.4", "name": "home.example.com", "type": "A"}
    /// ```
    async fn update_record(
        &self,
        zone_id: &str,
        record_id: &str,
        update: &RecordUpdate,
    ) -> Result<ApiResponse> {
        let url = self.record_url(zone_id, record_id);

        tracing::info!(
            "Updating Cloudflare DNS record: {} -> {} ({}) [mode: {}]",
            update.name,
            update.content,
            update.record_type,
            if self.dry_run { "DRY-RUN" } else { "LIVE" }
        );

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send PATCH request to {} with payload: {}",
                url,
                serde_json::to_string(update)?
            );
            return Ok(Self::dry_run_response(update));
        }

        let response = self
            .client
            .patch(&url)
            .bearer_auth(&self.api_token)
            .json(update)
            .send()
            .await
            .map_err(|e| Error::network(format!("HTTP request to Cloudflare failed: {}", e)))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read Cloudflare response: {}", e)))?;

        match status.as_u16() {
            200..=299 => {}
            401 | 403 => tracing::warn!(
                "Cloudflare authentication failed: invalid API token or insufficient permissions. Status: {}",
                status
            ),
            404 => tracing::warn!("Cloudflare zone or record not found. Status: {}", status),
            429 => tracing::warn!("Cloudflare rate limit exceeded. Status: {}", status),
            500..=599 => tracing::warn!("Cloudflare server error (transient). Status: {}", status),
            _ => tracing::warn!("Cloudflare update failed. Status: {}", status),
        }

        // Error statuses still carry the JSON envelope; only a missing envelope is a transport problem
        let api_response: ApiResponse = serde_json::from_str(&body).map_err(|e| {
            Error::network(format!(
                "Unexpected Cloudflare response (status {}): {}",
                status, e
            ))
        })?;

        if api_response.success {
            tracing::info!(
                "DNS record updated successfully: {} -> {}",
                update.name,
                update.content
            );
        }

        Ok(api_response)
    }

    fn provider_name(&self) -> &'static str {
        "cloudflare"
    }
}
