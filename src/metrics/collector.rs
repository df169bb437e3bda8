// src/metrics/collector.rs
use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Request metrics
    pub requests_total: IntCounterVec,
    pub request_duration_seconds: HistogramVec,
    pub unavailable_total: IntCounter,

    // Backend metrics
    pub probes_total: IntCounterVec,
    pub backend_health_status: IntGaugeVec,
    pub total_backends: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let requests_total = IntCounterVec::new(
            Opts::new("lb_requests_total", "Total number of forwarded requests"),
            &["backend", "status_code"],
        )?;
        registry.register(Box::new(requests_total.clone()))?;

        let request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "lb_request_duration_seconds",
                "Time to upstream response headers in seconds",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(request_duration_seconds.clone()))?;

        let unavailable_total = IntCounter::new(
            "lb_unavailable_total",
            "Requests answered 503 because every backend failed its probe",
        )?;
        registry.register(Box::new(unavailable_total.clone()))?;

        let probes_total = IntCounterVec::new(
            Opts::new("lb_probes_total", "Liveness probes by outcome"),
            &["backend", "result"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let backend_health_status = IntGaugeVec::new(
            Opts::new(
                "lb_backend_health_status",
                "Last probe result (1=alive, 0=dead)",
            ),
            &["backend"],
        )?;
        registry.register(Box::new(backend_health_status.clone()))?;

        let total_backends = IntGauge::new("lb_total_backends", "Total number of backends")?;
        registry.register(Box::new(total_backends.clone()))?;

        Ok(Self {
            requests_total,
            request_duration_seconds,
            unavailable_total,
            probes_total,
            backend_health_status,
            total_backends,
        })
    }

    pub fn record_request(&self, backend: &str, status_code: u16, duration: Duration) {
        let status = status_code.to_string();
        self.requests_total
            .with_label_values(&[backend, &status])
            .inc();

        self.request_duration_seconds
            .with_label_values(&[backend])
            .observe(duration.as_secs_f64());
    }

    pub fn record_probe(&self, backend: &str, alive: bool) {
        let result = if alive { "alive" } else { "dead" };
        self.probes_total.with_label_values(&[backend, result]).inc();
        self.backend_health_status
            .with_label_values(&[backend])
            .set(i64::from(alive));
    }

    pub fn record_unavailable(&self) {
        self.unavailable_total.inc();
    }

    pub fn set_total_backends(&self, total: usize) {
        self.total_backends.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_exposes_recorded_values() {
        let registry = MetricsRegistry::new().unwrap();
        let metrics = registry.collector();

        metrics.record_probe("http://a.local", true);
        metrics.record_probe("http://b.local", false);
        metrics.record_request("http://a.local", 200, Duration::from_millis(12));
        metrics.record_unavailable();
        metrics.set_total_backends(2);

        let text = String::from_utf8(registry.gather().unwrap()).unwrap();
        assert!(text.contains(r#"lb_probes_total{backend="http://b.local",result="dead"} 1"#));
        assert!(text.contains(r#"lb_requests_total{backend="http://a.local",status_code="200"} 1"#));
        assert!(text.contains("lb_unavailable_total 1"));
        assert!(text.contains("lb_total_backends 2"));
    }
}
