use std::net::{IpAddr, SocketAddr};

use axum::http::HeaderValue;
use courier_core::error::CoreError;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight dispatches at shutdown (default: `30`).
    pub shutdown_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                 | Default                 |
    /// |-------------------------|-------------------------|
    /// | `HOST`                  | `0.0.0.0`               |
    /// | `PORT`                  | `3000`                  |
    /// | `CORS_ORIGINS`          | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
    pub fn from_env() -> Result<Self, CoreError> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port = parse_env("PORT", "3000")?;

        let cors_origins = split_origins(
            &std::env::var("CORS_ORIGINS").unwrap_or_else(|_| "http://localhost:5173".into()),
        );

        let request_timeout_secs = parse_env("REQUEST_TIMEOUT_SECS", "30")?;
        let shutdown_timeout_secs = parse_env("SHUTDOWN_TIMEOUT_SECS", "30")?;

        let config = Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check values that would otherwise only fail once the server starts.
    pub fn validate(&self) -> Result<(), CoreError> {
        self.bind_addr()?;

        if self.request_timeout_secs == 0 {
            return Err(CoreError::Validation(
                "REQUEST_TIMEOUT_SECS must be greater than zero".to_string(),
            ));
        }

        for origin in &self.cors_origins {
            HeaderValue::from_str(origin).map_err(|e| {
                CoreError::Validation(format!("Invalid CORS origin '{origin}': {e}"))
            })?;
        }
        Ok(())
    }

    /// Socket address the server binds to.
    pub fn bind_addr(&self) -> Result<SocketAddr, CoreError> {
        let ip: IpAddr = self.host.parse().map_err(|_| {
            CoreError::Validation(format!("HOST must be an IP address, got '{}'", self.host))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Output format of the log subscriber, read from `LOG_FORMAT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines (default).
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; unset or unrecognised values fall back to pretty.
    pub fn from_env() -> Self {
        std::env::var("LOG_FORMAT")
            .map(|raw| Self::parse(&raw))
            .unwrap_or_default()
    }

    fn parse(raw: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: &str) -> Result<T, CoreError> {
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse()
        .map_err(|_| CoreError::Validation(format!("{name} must be a valid number, got '{raw}'")))
}

fn split_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
