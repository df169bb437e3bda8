// src/health/reporter.rs
use crate::load_balancer::{BackendHealth, Dispatcher};
use futures::StreamExt;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval_at, Duration, Instant};
use tracing::{info, warn};

/// Human-readable health report: once at startup, then optionally on a timer.
pub struct HealthReporter {
    dispatcher: Arc<Dispatcher>,
    interval: Option<Duration>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl HealthReporter {
    pub fn new(dispatcher: Arc<Dispatcher>, interval: Option<Duration>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            dispatcher,
            interval,
            shutdown_tx,
            shutdown_rx,
        }
    }

    pub async fn report(&self) -> Vec<BackendHealth> {
        let report: Vec<BackendHealth> = self.dispatcher.report_health().collect().await;

        info!("[Server Health Status]");
        for entry in &report {
            if entry.alive {
                info!("{}", entry);
            } else {
                warn!("{}", entry);
            }
        }

        let alive = report.iter().filter(|entry| entry.alive).count();
        info!("Health report complete: {}/{} alive", alive, report.len());
        report
    }

    /// Re-emits the report every interval until [`shutdown`](Self::shutdown).
    /// Returns immediately when no interval is configured.
    pub async fn start(self: Arc<Self>) {
        let Some(period) = self.interval else {
            return;
        };
        let mut ticker = interval_at(Instant::now() + period, period);
        let mut shutdown_rx = self.shutdown_rx.clone();

        info!("Starting periodic health report every {:?}", period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.report().await;
                }
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        info!("Health reporter shutting down");
                        break;
                    }
                }
            }
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }
}
