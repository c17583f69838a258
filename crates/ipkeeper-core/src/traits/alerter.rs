// # Alerter Trait
//
// Outbound alert delivery. Alerts are best-effort: callers log and swallow
// failures, an alert can never take the service down.

use async_trait::async_trait;
use tracing::warn;

/// Trait for alert delivery implementations
#[async_trait]
pub trait Alerter: Send + Sync {
    /// Deliver one alert
    async fn send_alert(&self, subject: &str, text: &str) -> Result<(), crate::Error>;
}

/// Fallback alerter used when no delivery channel is configured
///
/// It only writes the alert to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogAlerter;

#[async_trait]
impl Alerter for LogAlerter {
    async fn send_alert(&self, subject: &str, text: &str) -> Result<(), crate::Error> {
        warn!(subject, "Alerting not configured, alert only logged: {}", text);
        Ok(())
    }
}
