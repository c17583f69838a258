// # HTTP IP Resolver
//
// This crate provides an HTTP-based `IpResolver` for ipkeeper.
//
// ## Purpose
//
// This is a **fallback resolver** for networks where outbound DNS to
// OpenDNS is blocked. It fetches the address from a plain-text echo
// service (e.g., api.ipify.org) that answers with the caller's IP.
//
// ## Error classification
//
// - Request failures and non-2xx statuses: `Error::Network`
// - A body that is not an IPv4 address: `Error::Lookup`

use ipkeeper_core::traits::IpResolver;
use ipkeeper_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

/// Default echo service
pub const DEFAULT_IP_SERVICE: &str = "https://api.ipify.org";

/// Default HTTP timeout for lookups
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP-based IP resolver
#[derive(Debug, Clone)]
pub struct HttpIpResolver {
    /// URL answering with the caller's address as plain text
    url: String,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpResolver {
    /// Create a new HTTP IP resolver
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the IP from (e.g., "https://api.ipify.org")
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(url, DEFAULT_HTTP_TIMEOUT)
    }

    /// Create with a custom request timeout
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(Error::config("HTTP resolver URL cannot be empty"));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Parse an echo-service body into an IPv4 address
fn parse_ipv4(body: &str) -> Result<Ipv4Addr> {
    let text = body.trim();
    match text.parse::<IpAddr>() {
        Ok(IpAddr::V4(ip)) => Ok(ip),
        Ok(IpAddr::V6(ip)) => Err(Error::lookup(format!("Expected IPv4, got: {}", ip))),
        Err(_) => Err(Error::lookup(format!("Invalid IP address: {:?}", text))),
    }
}

#[async_trait::async_trait]
impl IpResolver for HttpIpResolver {
    async fn lookup(&self) -> Result<Ipv4Addr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::network(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::network(format!("HTTP error: {}", response.status())));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::network(format!("Failed to read response: {}", e)))?;

        let ip = parse_ipv4(&body)?;
        tracing::debug!("Resolved public IP via {}: {}", self.url, ip);
        Ok(ip)
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
