//! Alerting on unexpected service stops

use ipkeeper_core::traits::Alerter;
use ipkeeper_core::{UpdateResult, UpdateService};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub const ALERT_SUBJECT: &str = "DynamicDNS update error";

/// Alert body describing the last attempt before the stop
pub fn alert_text(last_result: Option<&UpdateResult>) -> String {
    let ip = last_result
        .and_then(UpdateResult::ip)
        .map_or_else(|| "-".to_string(), |ip| ip.to_string());

    let response = last_result
        .and_then(UpdateResult::api_response)
        .and_then(|response| serde_json::to_string_pretty(response).ok())
        .unwrap_or_else(|| "-".to_string());

    format!(
        "The service has been interrupted.\nLast ip = {}\nLast response:\n{}",
        ip, response
    )
}

/// Register a stop hook on `service` that alerts through `alerter`
///
/// Only stops caused by repeated API errors raise an alert. Delivery runs on
/// a separate task so the scheduler never waits on it; failures are logged.
/// The worker exits when `shutdown` is cancelled.
pub fn spawn_stop_alerts(
    service: &UpdateService,
    alerter: Arc<dyn Alerter>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    let (tx, mut rx) = mpsc::unbounded_channel::<()>();
    service.on_stop(move |unexpected| {
        if unexpected {
            let _ = tx.send(());
        }
    });

    let service = service.clone();
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                received = rx.recv() => {
                    if received.is_none() {
                        break;
                    }
                    let text = alert_text(service.last_result().as_ref());
                    match alerter.send_alert(ALERT_SUBJECT, &text).await {
                        Ok(()) => info!("Stop alert sent"),
                        Err(e) => warn!("Failed to send stop alert: {}", e),
                    }
                }
            }
        }
    })
}
