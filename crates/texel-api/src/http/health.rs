//! Liveness, health and metrics endpoints.

use std::sync::Arc;

use axum::{Json, body::Body, extract::State, http::StatusCode, response::Response};
use texel_telemetry::build_sha;
use tracing::{error, warn};

use crate::http::constants::LIVENESS_MESSAGE;
use crate::http::errors::ApiError;
use crate::models::{HealthResponse, LivenessResponse};
use crate::state::ApiState;

pub(crate) async fn liveness() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        message: LIVENESS_MESSAGE.to_string(),
    })
}

pub(crate) async fn health(State(state): State<Arc<ApiState>>) -> (StatusCode, Json<HealthResponse>) {
    let healthy = state.service.is_healthy();
    let (status, section, code) = if healthy {
        ("ok", "ok", StatusCode::OK)
    } else {
        warn!("working-directory critical section is poisoned");
        ("degraded", "poisoned", StatusCode::SERVICE_UNAVAILABLE)
    };
    (
        code,
        Json(HealthResponse {
            status: status.to_string(),
            critical_section: section.to_string(),
            build: build_sha().to_string(),
        }),
    )
}

pub(crate) async fn metrics(State(state): State<Arc<ApiState>>) -> Result<Response, ApiError> {
    match state.telemetry.render() {
        Ok(body) => Response::builder()
            .status(StatusCode::OK)
            .header(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )
            .body(Body::from(body))
            .map_err(|err| {
                error!(error = %err, "failed to build metrics response");
                ApiError::internal("failed to build metrics response")
            }),
        Err(err) => {
            error!(error = %err, "failed to render metrics");
            Err(ApiError::internal("failed to render metrics"))
        }
    }
}
