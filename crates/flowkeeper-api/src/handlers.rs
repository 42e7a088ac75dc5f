//! Axum route handlers.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use flowkeeper_control::ControlPlaneError;
use serde::Serialize;
use tracing::warn;

use crate::ApiState;

/// Standard API response wrapper.
#[derive(Serialize)]
struct ApiResponse<T: Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

/// A 404 from the control plane stays a 404; anything else is a bad gateway.
fn upstream_error(e: &ControlPlaneError) -> axum::response::Response {
    let status = match e.status() {
        Some(404) => StatusCode::NOT_FOUND,
        _ => StatusCode::BAD_GATEWAY,
    };
    warn!(error = %e, status = status.as_u16(), "control plane request failed");
    error_response(&e.to_string(), status).into_response()
}

/// GET /healthz
pub async fn healthz() -> &'static str {
    "ok"
}

/// GET /api/v1/pipelines
pub async fn list_pipelines(State(state): State<ApiState>) -> impl IntoResponse {
    match state.client.list_pipelines().await {
        Ok(pipelines) => ApiResponse::ok(pipelines).into_response(),
        Err(e) => upstream_error(&e),
    }
}

/// GET /api/v1/pipelines/:id/jobs
pub async fn list_jobs(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    match state.client.list_jobs(&id).await {
        Ok(jobs) => ApiResponse::ok(jobs).into_response(),
        Err(e) => upstream_error(&e),
    }
}

/// GET /api/v1/status
pub async fn status(State(state): State<ApiState>) -> impl IntoResponse {
    ApiResponse::ok(state.metrics.snapshot())
}

/// GET /metrics
pub async fn prometheus_metrics(State(state): State<ApiState>) -> impl IntoResponse {
    let body = flowkeeper_metrics::render_prometheus(&state.metrics.snapshot());
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
        body,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use flowkeeper_control::ControlPlaneClient;
    use flowkeeper_metrics::OrchestratorMetrics;

    fn unreachable_state() -> ApiState {
        // Port 9 (discard) on localhost: nothing listens in the test environment.
        ApiState {
            client: ControlPlaneClient::new("127.0.0.1:9", "/api/v1", Duration::from_millis(500)),
            metrics: Arc::new(OrchestratorMetrics::new()),
        }
    }

    #[tokio::test]
    async fn healthz_is_ok() {
        assert_eq!(healthz().await, "ok");
    }

    #[tokio::test]
    async fn unreachable_control_plane_is_bad_gateway() {
        let resp = list_pipelines(State(unreachable_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn prometheus_endpoint_returns_text() {
        let state = unreachable_state();
        state.metrics.record_restart(true);
        let resp = prometheus_metrics(State(state)).await.into_response();
        assert_eq!(resp.status(), StatusCode::OK);
        let content_type = resp.headers().get("content-type").unwrap().to_str().unwrap();
        assert!(content_type.contains("text/plain"));
    }
}
