// ────────────────────────────────
// src/server/admin.rs
// Side listener for Prometheus text and the on-demand health report
// ────────────────────────────────
use crate::config::AdminConfig;
use crate::load_balancer::{BackendHealth, Dispatcher};
use crate::metrics::MetricsRegistry;
use anyhow::Result;
use futures::StreamExt;
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::{Body, Request, Response, Server, StatusCode};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info};

pub struct AdminState {
    config: AdminConfig,
    registry: Arc<MetricsRegistry>,
    dispatcher: Arc<Dispatcher>,
}

impl AdminState {
    pub fn new(config: AdminConfig, registry: Arc<MetricsRegistry>, dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            config,
            registry,
            dispatcher,
        }
    }
}

pub async fn start_admin_server(state: AdminState) -> Result<SocketAddr> {
    let addr: SocketAddr = ([0, 0, 0, 0], state.config.port).into();
    let state = Arc::new(state);

    let make_service = hyper::service::make_service_fn(move |_| {
        let state = state.clone();
        async move {
            Ok::<_, Infallible>(hyper::service::service_fn(move |req: Request<Body>| {
                let state = state.clone();
                async move { Ok::<_, Infallible>(admin_response(&state, req).await) }
            }))
        }
    });

    let server = Server::try_bind(&addr)?.serve(make_service);
    let local = server.local_addr();
    info!("Admin server listening on http://{}", local);

    tokio::spawn(async move {
        if let Err(e) = server.await {
            error!("Admin server error: {}", e);
        }
    });

    Ok(local)
}

async fn admin_response(state: &AdminState, req: Request<Body>) -> Response<Body> {
    let path = req.uri().path();

    if path == state.config.metrics_path {
        match state.registry.gather() {
            Ok(metrics) => text(StatusCode::OK, "text/plain; version=0.0.4", metrics),
            Err(e) => {
                error!("Failed to encode metrics: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "metrics unavailable")
            }
        }
    } else if path == state.config.health_path {
        let report: Vec<BackendHealth> = state.dispatcher.report_health().collect().await;
        let status = if report.iter().any(|entry| entry.alive) {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        match serde_json::to_vec(&report) {
            Ok(json) => text(status, "application/json", json),
            Err(e) => {
                error!("Failed to serialize health report: {}", e);
                text(StatusCode::INTERNAL_SERVER_ERROR, "text/plain", "report unavailable")
            }
        }
    } else {
        text(StatusCode::NOT_FOUND, "text/plain", "Not Found")
    }
}

fn text(status: StatusCode, content_type: &'static str, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{body_text, dispatcher};

    fn state(backends: &[(&str, bool)]) -> AdminState {
        let registry = Arc::new(MetricsRegistry::new().unwrap());
        let (lb, _) = dispatcher(backends);
        let lb = lb.with_metrics(registry.collector());
        AdminState::new(AdminConfig::default(), registry, Arc::new(lb))
    }

    fn get(path: &str) -> Request<Body> {
        Request::get(path).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_health_report_as_json() {
        let state = state(&[("A", true), ("B", false)]);

        let response = admin_response(&state, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");

        let body: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body[0]["address"], "A");
        assert_eq!(body[0]["alive"], true);
        assert_eq!(body[1]["alive"], false);
    }

    #[tokio::test]
    async fn test_health_all_dead_is_503() {
        let state = state(&[("A", false)]);
        let response = admin_response(&state, get("/health")).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_and_unknown_paths() {
        let state = state(&[("A", true)]);
        state.dispatcher.select_next().await;

        let metrics = admin_response(&state, get("/metrics")).await;
        assert_eq!(metrics.status(), StatusCode::OK);
        let text = body_text(metrics).await;
        assert!(text.contains("lb_total_backends 1"));
        assert!(text.contains(r#"lb_probes_total{backend="A",result="alive"} 1"#));

        let missing = admin_response(&state, get("/nope")).await;
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
