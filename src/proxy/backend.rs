// src/proxy/backend.rs
use super::proxy::ReverseProxy;
use crate::config::{BackendConfig, ConfigError, ProbeConfig};
use async_trait::async_trait;
use hyper::{Body, Request, Response, StatusCode};
use reqwest::Client;
use std::net::SocketAddr;
use tracing::warn;
use url::Url;

/// One upstream server the dispatcher can hand requests to.
#[async_trait]
pub trait Backend: Send + Sync {
    fn address(&self) -> &str;

    /// Probes the backend; `false` on any transport error or non-200 status.
    async fn is_alive(&self) -> bool;

    /// Proxies the request and returns the response to stream back to the client.
    /// Upstream failures are turned into an error response, never propagated.
    async fn forward(&self, req: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body>;
}

pub struct HttpBackend {
    address: String,
    probe_url: Url,
    probe_client: Client,
    proxy: ReverseProxy,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig, probe: &ProbeConfig) -> Result<Self, ConfigError> {
        let url = config.parse_url()?;

        let probe_url = match &probe.path {
            Some(path) => url.join(path).map_err(|source| ConfigError::InvalidAddress {
                address: format!("{}{}", config.url, path),
                source,
            })?,
            None => url.clone(),
        };

        let mut builder = Client::builder();
        if let Some(timeout) = probe.timeout() {
            builder = builder.timeout(timeout);
        }
        let probe_client = builder.build()?;

        Ok(Self {
            address: config.url.clone(),
            probe_url,
            probe_client,
            proxy: ReverseProxy::new(url),
        })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    fn address(&self) -> &str {
        &self.address
    }

    async fn is_alive(&self) -> bool {
        match self.probe_client.get(self.probe_url.clone()).send().await {
            Ok(response) if response.status() == StatusCode::OK => true,
            Ok(response) => {
                warn!(
                    address = %self.address,
                    status = response.status().as_u16(),
                    "liveness probe returned unexpected status"
                );
                false
            }
            Err(e) => {
                warn!(address = %self.address, error = %e, "liveness probe failed");
                false
            }
        }
    }

    async fn forward(&self, req: Request<Body>, client_addr: Option<SocketAddr>) -> Response<Body> {
        match self.proxy.forward(req, client_addr).await {
            Ok(response) => response,
            Err(e) => {
                warn!(address = %self.address, error = %e, "forwarding failed");
                e.into()
            }
        }
    }
}
