use std::{env, net::SocketAddr, time::Duration};

use axum::http::HeaderValue;
use thiserror::Error;

pub const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["https://claude.ai", "https://app.claude.ai"];
pub const DEFAULT_TRACES_SAMPLE_RATE: f32 = 0.1;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub bind_port: u16,
    pub environment: String,
    pub sentry_dsn: Option<String>,
    pub traces_sample_rate: f32,
    pub allowed_origins: Vec<HeaderValue>,
    pub sweep_interval: Duration,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    Memory,
    Cloudflare(CloudflareConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudflareConfig {
    pub account_id: String,
    pub api_token: String,
    pub sessions_namespace_id: String,
    pub documents_bucket: String,
    pub r2_access_key_id: String,
    pub r2_secret_access_key: String,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("invalid bind address or port")]
    InvalidSocket,
    #[error("CORS_ALLOWED_ORIGINS entry `{0}` is not a valid origin")]
    InvalidAllowedOrigin(String),
    #[error("SESSION_SWEEP_INTERVAL_SECS must be a positive integer")]
    InvalidSweepInterval,
    #[error("{0} is required when CLOUDFLARE_ACCOUNT_ID is set")]
    MissingCloudflareSetting(&'static str),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any variable source; values are trimmed
    /// and empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let bind_addr = var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = var("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let environment = var("ENVIRONMENT").unwrap_or_else(|| "production".to_string());
        let sentry_dsn = var("SENTRY_DSN");
        let traces_sample_rate = var("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|value| value.parse::<f32>().ok())
            .filter(|rate| (0.0..=1.0).contains(rate))
            .unwrap_or(DEFAULT_TRACES_SAMPLE_RATE);
        let allowed_origins = match var("CORS_ALLOWED_ORIGINS") {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|origin| !origin.is_empty())
                .map(parse_origin)
                .collect::<Result<Vec<_>, _>>()?,
            None => DEFAULT_ALLOWED_ORIGINS
                .into_iter()
                .map(HeaderValue::from_static)
                .collect(),
        };
        let sweep_interval = var("SESSION_SWEEP_INTERVAL_SECS")
            .map(|value| match value.parse::<u64>() {
                Ok(secs) if secs > 0 => Ok(secs),
                _ => Err(ConfigError::InvalidSweepInterval),
            })
            .transpose()?
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS));

        let storage = match var("CLOUDFLARE_ACCOUNT_ID") {
            None => StorageConfig::Memory,
            Some(account_id) => {
                let required = |key: &'static str| {
                    var(key).ok_or(ConfigError::MissingCloudflareSetting(key))
                };
                StorageConfig::Cloudflare(CloudflareConfig {
                    account_id,
                    api_token: required("CLOUDFLARE_API_TOKEN")?,
                    sessions_namespace_id: required("KV_SESSIONS_NAMESPACE_ID")?,
                    documents_bucket: required("R2_BUCKET_NAME")?,
                    r2_access_key_id: required("R2_ACCESS_KEY_ID")?,
                    r2_secret_access_key: required("R2_SECRET_ACCESS_KEY")?,
                })
            }
        };

        let config = Self {
            bind_addr,
            bind_port,
            environment,
            sentry_dsn,
            traces_sample_rate,
            allowed_origins,
            sweep_interval,
            storage,
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}

/// Credentialed CORS cannot use the wildcard, so only concrete origins are accepted.
fn parse_origin(origin: &str) -> Result<HeaderValue, ConfigError> {
    if origin == "*" {
        return Err(ConfigError::InvalidAllowedOrigin(origin.to_string()));
    }
    origin
        .parse::<HeaderValue>()
        .map_err(|_| ConfigError::InvalidAllowedOrigin(origin.to_string()))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn parse(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn parse_defaults() {
        let config = parse(&[]).expect("config should parse");

        assert_eq!(config.bind_addr, "127.0.0.1");
        assert_eq!(config.bind_port, 8080);
        assert_eq!(config.environment, "production");
        assert_eq!(config.sentry_dsn, None);
        assert_eq!(config.traces_sample_rate, DEFAULT_TRACES_SAMPLE_RATE);
        assert_eq!(
            config.allowed_origins,
            vec![
                HeaderValue::from_static("https://claude.ai"),
                HeaderValue::from_static("https://app.claude.ai"),
            ]
        );
        assert_eq!(config.sweep_interval, Duration::from_secs(3600));
        assert_eq!(config.storage, StorageConfig::Memory);
    }

    #[test]
    fn unparsable_sample_rate_falls_back_to_default() {
        let config = parse(&[("SENTRY_TRACES_SAMPLE_RATE", "often")]).expect("config");
        assert_eq!(config.traces_sample_rate, DEFAULT_TRACES_SAMPLE_RATE);

        let config = parse(&[("SENTRY_TRACES_SAMPLE_RATE", "7")]).expect("config");
        assert_eq!(config.traces_sample_rate, DEFAULT_TRACES_SAMPLE_RATE);

        let config = parse(&[("SENTRY_TRACES_SAMPLE_RATE", "0.5")]).expect("config");
        assert_eq!(config.traces_sample_rate, 0.5);
    }

    #[test]
    fn blank_dsn_disables_reporting() {
        let config = parse(&[("SENTRY_DSN", "   ")]).expect("config");
        assert_eq!(config.sentry_dsn, None);
    }

    #[test]
    fn invalid_port_fails() {
        let err = parse(&[("BIND_PORT", "http")]).expect_err("expected invalid port");
        assert!(matches!(err, ConfigError::InvalidPort));
    }

    #[test]
    fn zero_sweep_interval_fails() {
        let err = parse(&[("SESSION_SWEEP_INTERVAL_SECS", "0")]).expect_err("expected error");
        assert!(matches!(err, ConfigError::InvalidSweepInterval));
    }

    #[test]
    fn cloudflare_requires_every_setting() {
        let err = parse(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "token"),
        ])
        .expect_err("expected missing setting");
        assert!(matches!(
            err,
            ConfigError::MissingCloudflareSetting("KV_SESSIONS_NAMESPACE_ID")
        ));
    }

    #[test]
    fn cloudflare_settings_parse() {
        let config = parse(&[
            ("CLOUDFLARE_ACCOUNT_ID", "acct"),
            ("CLOUDFLARE_API_TOKEN", "token"),
            ("KV_SESSIONS_NAMESPACE_ID", "sessions"),
            ("R2_BUCKET_NAME", "documents"),
            ("R2_ACCESS_KEY_ID", "key"),
            ("R2_SECRET_ACCESS_KEY", "secret"),
            ("CORS_ALLOWED_ORIGINS", "https://a.example, https://b.example"),
        ])
        .expect("config");

        let StorageConfig::Cloudflare(cloudflare) = config.storage else {
            panic!("expected cloudflare storage");
        };
        assert_eq!(cloudflare.sessions_namespace_id, "sessions");
        assert_eq!(cloudflare.documents_bucket, "documents");
        assert_eq!(
            config.allowed_origins,
            vec![
                HeaderValue::from_static("https://a.example"),
                HeaderValue::from_static("https://b.example"),
            ]
        );
    }

    #[test]
    fn wildcard_origin_fails() {
        let err = parse(&[("CORS_ALLOWED_ORIGINS", "https://claude.ai, *")])
            .expect_err("expected invalid origin");
        assert!(matches!(err, ConfigError::InvalidAllowedOrigin(origin) if origin == "*"));
    }

    #[test]
    fn unparsable_origin_fails() {
        let err = parse(&[("CORS_ALLOWED_ORIGINS", "https://bad\u{7f}.example")])
            .expect_err("expected invalid origin");
        assert!(matches!(err, ConfigError::InvalidAllowedOrigin(_)));
    }
}
