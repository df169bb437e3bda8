// src/load_balancer/round_robin.rs
use super::selection::{BackendHealth, Selection};
use crate::metrics::{MetricsCollector, Timer};
use crate::proxy::{Backend, BackendPool, ProxyError};
use chrono::Utc;
use futures::stream::{self, Stream, StreamExt};
use hyper::{Body, Request, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Round-robin dispatcher that skips backends failing their liveness probe.
///
/// The cursor advances once per probe. Every call claims its starting
/// position with a single atomic increment, so concurrent callers never start
/// from the same position, and a call that skips `k` dead backends advances
/// the cursor by `k` more. A sweep is bounded by the backend count; when every
/// probe fails the call reports [`Selection::Unavailable`].
pub struct Dispatcher {
    pool: BackendPool,
    cursor: AtomicUsize,
    metrics: Option<Arc<MetricsCollector>>,
}

impl Dispatcher {
    pub fn new(pool: BackendPool) -> Self {
        Self {
            pool,
            cursor: AtomicUsize::new(0),
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsCollector>) -> Self {
        metrics.set_total_backends(self.pool.len());
        self.metrics = Some(metrics);
        self
    }

    pub fn backends(&self) -> &BackendPool {
        &self.pool
    }

    pub async fn select_next(&self) -> Selection {
        let n = self.pool.len();
        let start = self.cursor.fetch_add(1, Ordering::SeqCst);

        for offset in 0..n {
            let backend = self.pool.get(start.wrapping_add(offset));
            if self.probe(backend).await {
                if offset > 0 {
                    self.cursor.fetch_add(offset, Ordering::SeqCst);
                }
                return Selection::Selected(backend.clone());
            }
        }

        self.cursor.fetch_add(n - 1, Ordering::SeqCst);
        Selection::Unavailable
    }

    /// Selects a live backend and lets it answer; 503 when none is.
    pub async fn dispatch(
        &self,
        req: Request<Body>,
        client_addr: Option<SocketAddr>,
    ) -> Response<Body> {
        let backend = match self.select_next().await {
            Selection::Selected(backend) => backend,
            Selection::Unavailable => {
                warn!("All {} backends failed their liveness probe", self.pool.len());
                if let Some(metrics) = &self.metrics {
                    metrics.record_unavailable();
                }
                return ProxyError::NoHealthyBackends.into();
            }
        };

        info!(address = %backend.address(), "request_forwarded");
        let timer = Timer::new();
        let response = backend.forward(req, client_addr).await;

        if let Some(metrics) = &self.metrics {
            metrics.record_request(backend.address(), response.status().as_u16(), timer.elapsed());
        }
        response
    }

    /// Probes every backend once, in configured order, leaving the cursor alone.
    pub fn report_health(&self) -> impl Stream<Item = BackendHealth> + '_ {
        stream::iter(self.pool.iter()).then(move |backend| async move {
            let alive = self.probe(backend).await;
            BackendHealth {
                address: backend.address().to_string(),
                alive,
                checked_at: Utc::now(),
            }
        })
    }

    async fn probe(&self, backend: &Arc<dyn Backend>) -> bool {
        let alive = backend.is_alive().await;
        debug!(address = %backend.address(), alive, "server_checked");
        if let Some(metrics) = &self.metrics {
            metrics.record_probe(backend.address(), alive);
        }
        alive
    }
}
