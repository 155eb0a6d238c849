//! Liveness, readiness and metrics endpoints for the orchestrator.
//!
//! - `/healthz` always answers `ok` while the process runs
//! - `/readyz` answers `ok` once the RPC listener is bound, 503 otherwise
//! - `/metrics` renders Prometheus text when a recorder is installed

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::sync::watch;
use tracing::info;

#[derive(Clone)]
pub struct ReadinessCheck {
    ready: watch::Receiver<bool>,
}

impl ReadinessCheck {
    pub fn new(ready: watch::Receiver<bool>) -> Self {
        Self { ready }
    }
}

pub fn health_router(readiness: ReadinessCheck, metrics: Option<PrometheusHandle>) -> Router {
    let router = Router::new()
        .route("/healthz", get(health_handler))
        .route("/readyz", get(readiness_handler))
        .with_state(readiness);

    match metrics {
        Some(handle) => router.route(
            "/metrics",
            get(move || {
                let handle = handle.clone();
                async move { handle.render() }
            }),
        ),
        None => router,
    }
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn readiness_handler(
    State(check): State<ReadinessCheck>,
) -> Result<&'static str, StatusCode> {
    if *check.ready.borrow() {
        Ok("ok")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE)
    }
}

/// Resolve on SIGINT or SIGTERM, marking the process not ready first.
pub async fn shutdown_signal(readiness_tx: Option<watch::Sender<bool>>) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to install SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM, shutting down gracefully"),
        _ = sigint.recv() => info!("received SIGINT, shutting down gracefully"),
    }

    // Drain traffic before the listeners close.
    if let Some(tx) = readiness_tx {
        let _ = tx.send(false);
    }
}
