//! flowkeeper-api — status server for the flowkeeper daemon.
//!
//! Read-only: pipelines and jobs are proxied from the control plane,
//! counters come from the daemon's own loops.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/healthz` | Liveness |
//! | GET | `/metrics` | Prometheus exposition of orchestrator counters |
//! | GET | `/api/v1/pipelines` | Pipelines known to the control plane |
//! | GET | `/api/v1/pipelines/{id}/jobs` | Jobs of one pipeline |
//! | GET | `/api/v1/status` | Counter snapshot as JSON |

pub mod handlers;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use flowkeeper_control::ControlPlaneClient;
use flowkeeper_metrics::OrchestratorMetrics;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub client: ControlPlaneClient,
    pub metrics: Arc<OrchestratorMetrics>,
}

/// Build the status router.
pub fn build_router(state: ApiState) -> Router {
    let api_routes = Router::new()
        .route("/pipelines", get(handlers::list_pipelines))
        .route("/pipelines/{id}/jobs", get(handlers::list_jobs))
        .route("/status", get(handlers::status))
        .with_state(state.clone());

    Router::new()
        .nest("/api/v1", api_routes)
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::prometheus_metrics).with_state(state))
}
