//! Probes and Prometheus metrics
//!
//! Serves:
//! - `/healthz` - liveness, 200 while the process runs
//! - `/readyz` - readiness, 200 once the controller is watching
//! - `/metrics` - Prometheus text format

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{error, info};

/// Controller metrics
#[derive(Clone)]
pub struct Metrics {
    /// Reconciliation passes by result ("success", "requeue", "error")
    pub reconciliations_total: IntCounterVec,
    /// NetworkInterface objects created
    pub interfaces_created_total: IntCounter,
    /// NetworkInterface objects whose address finalizer was cleared
    pub interfaces_finalized_total: IntCounter,
    /// Cloud private NICs created
    pub private_nics_created_total: IntCounter,
    /// Cloud private NICs deleted
    pub private_nics_deleted_total: IntCounter,
    registry: Registry,
}

impl Metrics {
    /// Create and register all metrics
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let reconciliations_total = IntCounterVec::new(
            Opts::new(
                "private_network_reconciliations_total",
                "PrivateNetwork reconciliation passes by result",
            ),
            &["result"],
        )?;
        let interfaces_created_total = IntCounter::new(
            "private_network_interfaces_created_total",
            "NetworkInterface objects created",
        )?;
        let interfaces_finalized_total = IntCounter::new(
            "private_network_interfaces_finalized_total",
            "NetworkInterface objects released and finalized",
        )?;
        let private_nics_created_total = IntCounter::new(
            "private_network_cloud_nics_created_total",
            "Cloud private NICs created",
        )?;
        let private_nics_deleted_total = IntCounter::new(
            "private_network_cloud_nics_deleted_total",
            "Cloud private NICs deleted",
        )?;

        registry.register(Box::new(reconciliations_total.clone()))?;
        registry.register(Box::new(interfaces_created_total.clone()))?;
        registry.register(Box::new(interfaces_finalized_total.clone()))?;
        registry.register(Box::new(private_nics_created_total.clone()))?;
        registry.register(Box::new(private_nics_deleted_total.clone()))?;

        Ok(Self {
            reconciliations_total,
            interfaces_created_total,
            interfaces_finalized_total,
            private_nics_created_total,
            private_nics_deleted_total,
            registry,
        })
    }

    /// Count a finished reconciliation pass
    pub fn record_reconcile(&self, result: &str) {
        self.reconciliations_total.with_label_values(&[result]).inc();
    }

    /// Encode metrics to Prometheus text format
    pub fn encode(&self) -> String {
        let mut buffer = Vec::new();
        if let Err(e) = TextEncoder::new().encode(&self.registry.gather(), &mut buffer) {
            error!("Failed to encode metrics: {}", e);
            return "# Error encoding metrics".to_string();
        }
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

/// Shared state of the probes server
pub struct HealthState {
    ready: AtomicBool,
    /// Metrics registry
    pub metrics: Metrics,
}

impl HealthState {
    /// Create a new health state (starts as not ready)
    pub fn new(metrics: Metrics) -> Self {
        Self {
            ready: AtomicBool::new(false),
            metrics,
        }
    }

    /// Mark the controller as ready or not ready
    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    /// Check if the controller is ready
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(State(state): State<Arc<HealthState>>) -> Response {
    if state.is_ready() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready").into_response()
    }
}

async fn metrics_handler(State(state): State<Arc<HealthState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        state.metrics.encode(),
    )
}

/// Create the probes router
pub fn create_router(state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

/// Run the probes server until it fails
pub async fn run_health_server(addr: SocketAddr, state: Arc<HealthState>) -> Result<(), std::io::Error> {
    let app = create_router(state);
    info!(%addr, "Starting probes server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
