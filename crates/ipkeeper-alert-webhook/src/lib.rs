// # Webhook Alerter
//
// This crate provides an `Alerter` that POSTs alerts as JSON to a webhook
// (chat integrations, mail relays, incident tooling).
//
// ## Payload
//
// ```json
// {"subject": "DynamicDNS update error", "text": "The service has been interrupted. ..."}
// ```
//
// Delivery is single-shot. Callers treat alerts as best-effort and only log
// a failed delivery.

use ipkeeper_core::traits::Alerter;
use ipkeeper_core::{Error, Result};
use serde::Serialize;
use std::time::Duration;

/// Default HTTP timeout for alert delivery
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// JSON body sent to the webhook
#[derive(Debug, Serialize)]
struct AlertPayload<'a> {
    subject: &'a str,
    text: &'a str,
}

/// Alerter posting JSON to a webhook URL
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    url: String,
    client: reqwest::Client,
}

impl WebhookAlerter {
    /// Create an alerter for `url`
    ///
    /// # Returns
    ///
    /// - `Ok(WebhookAlerter)`: Ready to deliver
    /// - `Err(Error::Config)`: The URL is not http(s), or the HTTP client could not be built
    pub fn new(url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::config(format!(
                "Alert webhook URL must start with http:// or https://, got: {}",
                url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait::async_trait]
impl Alerter for WebhookAlerter {
    async fn send_alert(&self, subject: &str, text: &str) -> Result<()> {
        let response = self
            .client
            .post(&self.url)
            .json(&AlertPayload { subject, text })
            .send()
            .await
            .map_err(|e| Error::alert(format!("Webhook request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::alert(format!(
                "Webhook answered with status {}",
                response.status()
            )));
        }

        tracing::info!(subject, "Alert delivered to webhook");
        Ok(())
    }
}
