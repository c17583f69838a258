// # ipkeeperd - Dynamic DNS Daemon
//
// Keeps one Cloudflare A record pointed at the host's public IPv4 address.
//
// The daemon is a thin integration layer. Scheduling, retry and the update
// logic live in ipkeeper-core; this binary:
// 1. Reads configuration from environment variables
// 2. Builds the resolver, the record client and the alerter
// 3. Starts the update service (unless autostart is disabled)
// 4. Serves the HTTP status/control API until SIGTERM or SIGINT
//
// ## Configuration
//
// ### Record (required)
// - `IPKEEPER_API_TOKEN`: Cloudflare API token
// - `IPKEEPER_ZONE_ID`: Zone identifier
// - `IPKEEPER_RECORD_ID`: Record identifier
// - `IPKEEPER_RECORD_NAME`: Fully qualified record name
//
// ### Optional
// - `IPKEEPER_PORT`: Control API port (default 3000)
// - `IPKEEPER_BIND`: Control API address (default 0.0.0.0)
// - `IPKEEPER_LOG_LEVEL`: trace, debug, info, warn, error (default info)
// - `IPKEEPER_RESOLVER`: opendns or http (default opendns)
// - `IPKEEPER_RESOLVER_URL`: Echo service for the http resolver
// - `IPKEEPER_ALERT_WEBHOOK_URL`: Where stop alerts are posted (log only if unset)
// - `IPKEEPER_MODE`: `dry-run` logs record updates instead of sending them
// - `IPKEEPER_AUTOSTART`: Start the service at boot (default true)
//
// ## Example
//
// ```bash
// export IPKEEPER_API_TOKEN=...
// export IPKEEPER_ZONE_ID=023e105f4ecef8ad9ca31a8372d0c353
// export IPKEEPER_RECORD_ID=372e67954025e0ba6aaa6d586b9e0b59
// export IPKEEPER_RECORD_NAME=home.example.com
//
// ipkeeperd
// curl localhost:3000/status
// ```

mod alert;
mod config;
mod http;

use anyhow::Result;
use config::{Config, ResolverKind};
use ipkeeper_alert_webhook::WebhookAlerter;
use ipkeeper_core::traits::{Alerter, IpResolver, LogAlerter};
use ipkeeper_core::UpdateService;
use ipkeeper_ip_http::HttpIpResolver;
use ipkeeper_ip_opendns::OpenDnsResolver;
use ipkeeper_provider_cloudflare::CloudflareClient;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// How long the HTTP server may take to drain after a shutdown signal
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum IpkeeperExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<IpkeeperExitCode> for ExitCode {
    fn from(code: IpkeeperExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return IpkeeperExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return IpkeeperExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return IpkeeperExitCode::ConfigError.into();
    }

    info!("Starting ipkeeperd");
    info!("Managing record {}", config.record_name);
    if config.dry_run {
        warn!("Dry-run mode: record updates are logged, not sent");
    }

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return IpkeeperExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async move {
        match build_service(&config) {
            Ok((service, alerter)) => {
                if let Err(e) = run_daemon(config, service, alerter).await {
                    error!("Daemon error: {}", e);
                    IpkeeperExitCode::RuntimeError
                } else {
                    IpkeeperExitCode::CleanShutdown
                }
            }
            Err(e) => {
                error!("Startup error: {}", e);
                IpkeeperExitCode::ConfigError
            }
        }
    })
    .into()
}

/// Wire the collaborators into an update service
fn build_service(config: &Config) -> Result<(UpdateService, Arc<dyn Alerter>)> {
    let resolver: Arc<dyn IpResolver> = match &config.resolver {
        ResolverKind::OpenDns => Arc::new(OpenDnsResolver::new()),
        ResolverKind::Http { url } => Arc::new(HttpIpResolver::new(url.clone())?),
    };
    info!("IP resolver: {}", resolver.name());

    let client = CloudflareClient::new(config.api_token.clone())?.with_dry_run(config.dry_run);

    let alerter: Arc<dyn Alerter> = match &config.alert_webhook_url {
        Some(url) => Arc::new(WebhookAlerter::new(url.clone())?),
        None => {
            info!("No alert webhook configured, alerts are only logged");
            Arc::new(LogAlerter)
        }
    };

    let service = UpdateService::new(&config.service_config(), resolver, Arc::new(client))?;
    Ok((service, alerter))
}

/// Serve the control API until a shutdown signal arrives
async fn run_daemon(config: Config, service: UpdateService, alerter: Arc<dyn Alerter>) -> Result<()> {
    let shutdown = CancellationToken::new();
    let alerts = alert::spawn_stop_alerts(&service, alerter, shutdown.clone());

    let addr = config.listen_addr();
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind control API on {}: {}", addr, e))?;
    info!("Control API listening on {}", addr);

    let signal = shutdown_signal()?;

    if config.autostart {
        service.start();
    } else {
        info!("Autostart disabled, waiting for POST /start-service");
    }

    let app = http::router(service.clone());
    let server_token = shutdown.clone();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { server_token.cancelled().await })
            .await
    });

    let finished = tokio::select! {
        name = signal => {
            info!("Received shutdown signal: {}", name);
            None
        }
        joined = &mut server => Some(joined),
    };

    info!("Shutting down daemon");
    service.stop();
    shutdown.cancel();

    let joined = match finished {
        Some(joined) => joined,
        None => tokio::time::timeout(SHUTDOWN_TIMEOUT, server)
            .await
            .map_err(|_| anyhow::anyhow!("Shutdown timeout after {:?}", SHUTDOWN_TIMEOUT))?,
    };

    if let Err(e) = alerts.await {
        warn!("Alert worker ended abnormally: {}", e);
    }

    joined
        .map_err(|e| anyhow::anyhow!("HTTP server task failed: {}", e))?
        .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
}

/// Install SIGTERM and SIGINT handlers
///
/// # Returns
///
/// A future resolving to the name of the first signal received.
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Fallback for non-Unix platforms: CTRL-C only
#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = &'static str>> {
    Ok(async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to wait for CTRL-C: {}", e);
        }
        "SIGINT"
    })
}
