//! Daemon configuration from environment variables

use anyhow::Result;
use ipkeeper_core::{RecordTarget, ServiceConfig};
use std::env;
use std::net::{IpAddr, SocketAddr};

/// Default HTTP echo service for `IPKEEPER_RESOLVER=http`
pub const DEFAULT_RESOLVER_URL: &str = "https://api.ipify.org";

/// Which public IP resolver to use
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverKind {
    OpenDns,
    Http { url: String },
}

/// Application configuration
pub struct Config {
    pub api_token: String,
    pub zone_id: String,
    pub record_id: String,
    pub record_name: String,
    pub bind: IpAddr,
    pub port: u16,
    pub log_level: String,
    pub resolver: ResolverKind,
    pub alert_webhook_url: Option<String>,
    pub dry_run: bool,
    pub autostart: bool,
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("api_token", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("record_id", &self.record_id)
            .field("record_name", &self.record_name)
            .field("bind", &self.bind)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("resolver", &self.resolver)
            .field("alert_webhook_url", &self.alert_webhook_url)
            .field("dry_run", &self.dry_run)
            .field("autostart", &self.autostart)
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup` (the environment in production)
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| -> Result<String> {
            match lookup(key) {
                Some(value) if !value.trim().is_empty() => Ok(value.trim().to_string()),
                _ => anyhow::bail!("{} is required. Set it via: export {}=...", key, key),
            }
        };
        let optional = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let port = match optional("IPKEEPER_PORT") {
            Some(port) => port
                .parse()
                .map_err(|_| anyhow::anyhow!("IPKEEPER_PORT must be a port number. Got: {}", port))?,
            None => 3000,
        };

        let bind = match optional("IPKEEPER_BIND") {
            Some(bind) => bind
                .parse()
                .map_err(|_| anyhow::anyhow!("IPKEEPER_BIND must be an IP address. Got: {}", bind))?,
            None => IpAddr::from([0, 0, 0, 0]),
        };

        let resolver = match optional("IPKEEPER_RESOLVER")
            .unwrap_or_else(|| "opendns".to_string())
            .to_lowercase()
            .as_str()
        {
            "opendns" => ResolverKind::OpenDns,
            "http" => ResolverKind::Http {
                url: optional("IPKEEPER_RESOLVER_URL")
                    .unwrap_or_else(|| DEFAULT_RESOLVER_URL.to_string()),
            },
            other => anyhow::bail!(
                "IPKEEPER_RESOLVER '{}' is not supported. Supported resolvers: opendns, http",
                other
            ),
        };

        let autostart = match optional("IPKEEPER_AUTOSTART").map(|v| v.to_lowercase()) {
            None => true,
            Some(v) if matches!(v.as_str(), "true" | "1" | "yes") => true,
            Some(v) if matches!(v.as_str(), "false" | "0" | "no") => false,
            Some(v) => anyhow::bail!("IPKEEPER_AUTOSTART must be true or false. Got: {}", v),
        };

        Ok(Self {
            api_token: required("IPKEEPER_API_TOKEN")?,
            zone_id: required("IPKEEPER_ZONE_ID")?,
            record_id: required("IPKEEPER_RECORD_ID")?,
            record_name: required("IPKEEPER_RECORD_NAME")?,
            bind,
            port,
            log_level: optional("IPKEEPER_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            resolver,
            alert_webhook_url: optional("IPKEEPER_ALERT_WEBHOOK_URL"),
            dry_run: optional("IPKEEPER_MODE").is_some_and(|m| m.eq_ignore_ascii_case("dry-run")),
            autostart,
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        // Check for obvious placeholder tokens (common mistake)
        let token_lower = self.api_token.to_lowercase();
        if token_lower.contains("your_token")
            || token_lower.contains("replace_me")
            || token_lower == "token"
        {
            anyhow::bail!(
                "IPKEEPER_API_TOKEN appears to be a placeholder. \
                Use an actual API token from your DNS provider."
            );
        }

        self.service_config().validate()?;

        if let ResolverKind::Http { url } = &self.resolver
            && !url.starts_with("https://")
            && !url.starts_with("http://")
        {
            anyhow::bail!(
                "IPKEEPER_RESOLVER_URL must use HTTP or HTTPS scheme. Got: {}",
                url
            );
        }

        if self.port == 0 {
            anyhow::bail!("IPKEEPER_PORT cannot be 0");
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "IPKEEPER_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    /// Configuration of the update service
    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig::new(RecordTarget::new(
            self.zone_id.clone(),
            self.record_id.clone(),
            self.record_name.clone(),
        ))
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    const REQUIRED: [(&str, &str); 4] = [
        ("IPKEEPER_API_TOKEN", "cf-token-0123456789"),
        ("IPKEEPER_ZONE_ID", "zone"),
        ("IPKEEPER_RECORD_ID", "record"),
        ("IPKEEPER_RECORD_NAME", "home.example.com"),
    ];

    fn with_required(extra: &[(&'static str, &'static str)]) -> Vec<(&'static str, &'static str)> {
        REQUIRED.iter().chain(extra).copied().collect()
    }

    #[test]
    fn test_defaults() {
        let config = load(&REQUIRED).unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen_addr().to_string(), "0.0.0.0:3000");
        assert_eq!(config.resolver, ResolverKind::OpenDns);
        assert_eq!(config.log_level, "info");
        assert!(config.autostart);
        assert!(!config.dry_run);
        assert!(config.alert_webhook_url.is_none());
    }

    #[test]
    fn test_missing_required_variable_fails() {
        for (missing, _) in REQUIRED {
            let vars: Vec<_> = REQUIRED.iter().copied().filter(|(k, _)| *k != missing).collect();
            let err = load(&vars).unwrap_err();
            assert!(err.to_string().contains(missing), "{}", err);
        }
    }

    #[test]
    fn test_blank_required_variable_fails() {
        let mut vars = REQUIRED.to_vec();
        vars[1] = ("IPKEEPER_ZONE_ID", "  ");
        assert!(load(&vars).is_err());
    }

    #[test]
    fn test_optional_overrides() {
        let config = load(&with_required(&[
            ("IPKEEPER_PORT", "8080"),
            ("IPKEEPER_BIND", "127.0.0.1"),
            ("IPKEEPER_RESOLVER", "http"),
            ("IPKEEPER_MODE", "dry-run"),
            ("IPKEEPER_AUTOSTART", "false"),
            ("IPKEEPER_ALERT_WEBHOOK_URL", "https://hooks.example.com/ddns"),
        ]))
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.listen_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(
            config.resolver,
            ResolverKind::Http {
                url: DEFAULT_RESOLVER_URL.to_string()
            }
        );
        assert!(config.dry_run);
        assert!(!config.autostart);
        assert_eq!(
            config.alert_webhook_url.as_deref(),
            Some("https://hooks.example.com/ddns")
        );
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(load(&with_required(&[("IPKEEPER_PORT", "http")])).is_err());
        assert!(load(&with_required(&[("IPKEEPER_RESOLVER", "stun")])).is_err());
        assert!(load(&with_required(&[("IPKEEPER_AUTOSTART", "maybe")])).is_err());

        let config = load(&with_required(&[("IPKEEPER_LOG_LEVEL", "loud")])).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_record_name_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[3] = ("IPKEEPER_RECORD_NAME", "bad_name.example.com");
        let config = load(&vars).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_placeholder_token_rejected() {
        let mut vars = REQUIRED.to_vec();
        vars[0] = ("IPKEEPER_API_TOKEN", "your_token_here");
        assert!(load(&vars).unwrap().validate().is_err());
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = load(&REQUIRED).unwrap();
        assert!(!format!("{:?}", config).contains("cf-token"));
    }
}
