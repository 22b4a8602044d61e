//! `GET /metrics`: Prometheus text exposition of the shared
//! `prometheus_client::Registry`, fed by the heartbeat gauge
//! (`sentinela_task::heartbeat`) and whatever else the process registers.

use crate::AppState;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use std::sync::Arc;

pub async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    let mut buffer = String::new();
    match prometheus_client::encoding::text::encode(&mut buffer, &state.metrics) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/openmetrics-text; version=1.0.0; charset=utf-8")],
            buffer,
        )
            .into_response(),
        Err(error) => {
            tracing::error!(%error, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
