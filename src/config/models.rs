// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;
use url::Url;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("no backends configured")]
    NoBackends,

    #[error("invalid backend address {address:?}: {source}")]
    InvalidAddress {
        address: String,
        #[source]
        source: url::ParseError,
    },

    #[error("backend address {0:?} must be an absolute http(s) URL with a host")]
    UnsupportedAddress(String),

    #[error("invalid listen address {0:?}")]
    InvalidListen(String),

    #[error("failed to build probe client: {0}")]
    ProbeClient(#[from] reqwest::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_listen")]
    pub listen: String,
    pub backends: Vec<BackendConfig>,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub report_interval_secs: Option<u64>,
    #[serde(default)]
    pub admin: AdminConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub url: String,
}

/// Liveness probe settings shared by every backend.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Path probed relative to the backend address; the address itself when unset.
    #[serde(default)]
    pub path: Option<String>,
    /// No timeout beyond the transport's own when unset.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_admin_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub metrics_path: String,
    #[serde(default = "default_health_path")]
    pub health_path: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_admin_port(),
            metrics_path: default_metrics_path(),
            health_path: default_health_path(),
        }
    }
}

fn default_listen() -> String {
    ":8081".to_string()
}

fn default_admin_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::NoBackends);
        }
        for backend in &self.backends {
            backend.parse_url()?;
        }
        self.listen_addr()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        parse_listen_addr(&self.listen)
    }

    pub fn report_interval(&self) -> Option<Duration> {
        self.report_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

impl BackendConfig {
    pub fn parse_url(&self) -> Result<Url, ConfigError> {
        let url = Url::parse(&self.url).map_err(|source| ConfigError::InvalidAddress {
            address: self.url.clone(),
            source,
        })?;
        match url.scheme() {
            "http" | "https" if url.host_str().is_some() => Ok(url),
            _ => Err(ConfigError::UnsupportedAddress(self.url.clone())),
        }
    }
}

impl ProbeConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Accepts `":8081"` (all interfaces) as well as a full `host:port`.
pub fn parse_listen_addr(listen: &str) -> Result<SocketAddr, ConfigError> {
    let candidate = if listen.starts_with(':') {
        format!("0.0.0.0{listen}")
    } else {
        listen.to_string()
    };
    candidate
        .parse()
        .map_err(|_| ConfigError::InvalidListen(listen.to_string()))
}
