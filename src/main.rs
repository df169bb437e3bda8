// src/main.rs
use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::info;

use round_robin_lb::{
    config,
    health::HealthReporter,
    load_balancer::Dispatcher,
    metrics::MetricsRegistry,
    proxy::BackendPool,
    server::{start_admin_server, AdminState, RequestHandler, ServerBuilder},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("round_robin_lb=debug".parse()?)
                .add_directive("hyper=info".parse()?),
        )
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    info!("Loading configuration from: {}", config_path);
    let config = config::load_config(&config_path).await?;
    let addr = config.listen_addr()?;

    // Initialize metrics
    let metrics_registry = Arc::new(MetricsRegistry::new()?);

    // Backends are fixed for the process lifetime
    let pool = BackendPool::from_config(&config).context("Invalid backend list")?;
    let dispatcher = Arc::new(Dispatcher::new(pool).with_metrics(metrics_registry.collector()));

    info!("Server started at {}", addr);

    let reporter = Arc::new(HealthReporter::new(dispatcher.clone(), config.report_interval()));
    reporter.report().await;
    tokio::spawn(reporter.clone().start());

    if config.admin.enabled {
        start_admin_server(AdminState::new(
            config.admin.clone(),
            metrics_registry.clone(),
            dispatcher.clone(),
        ))
        .await?;
    }

    ServerBuilder::new(addr)
        .with_handler(RequestHandler::new(dispatcher))
        .serve_with_shutdown(shutdown_signal())
        .await?;

    reporter.shutdown();
    info!("Load balancer stopped");
    Ok(())
}

// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
