//! `/monitor/*` (`spec.md` §6): the registry-backed read/write surface for
//! monitor metadata and code, ported from `routes/monitor_routes.py`.

use crate::AppState;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use sentinela_core::models::MonitorId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Serialize)]
pub struct MonitorSummary {
    pub id: MonitorId,
    pub name: String,
    pub enabled: bool,
}

pub async fn list(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MonitorSummary>>, StatusCode> {
    let monitors = state.store.list_monitors().await.map_err(|error| {
        tracing::error!(%error, "failed to list monitors");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(
        monitors
            .into_iter()
            .map(|m| MonitorSummary {
                id: m.id,
                name: m.name,
                enabled: m.enabled,
            })
            .collect(),
    ))
}

#[derive(Serialize)]
pub struct MonitorDetail {
    pub id: MonitorId,
    pub name: String,
    pub enabled: bool,
    pub code: Option<String>,
    pub additional_files: BTreeMap<String, String>,
}

pub async fn get(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Result<Json<MonitorDetail>, StatusCode> {
    let monitor = state
        .store
        .get_monitor_by_name(&name)
        .await
        .map_err(|error| {
            tracing::error!(%error, "failed to look up monitor");
            StatusCode::INTERNAL_SERVER_ERROR
        })?
        .ok_or(StatusCode::NOT_FOUND)?;

    let module = state.store.get_code_module(monitor.id).await.map_err(|error| {
        tracing::error!(%error, "failed to load code module");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    Ok(Json(MonitorDetail {
        id: monitor.id,
        name: monitor.name,
        enabled: monitor.enabled,
        code: module.as_ref().map(|m| m.code.clone()),
        additional_files: module.map(|m| m.additional_files).unwrap_or_default(),
    }))
}

#[derive(Deserialize)]
pub struct ValidateRequest {
    pub monitor_code: String,
}

pub async fn validate(Json(request): Json<ValidateRequest>) -> Response {
    match sentinela_controller::requests::monitor_code_validate(&request.monitor_code) {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response(),
        Err(error) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "error", "message": error.message, "errors": error.errors })),
        )
            .into_response(),
    }
}

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub monitor_code: String,
    #[serde(default)]
    pub additional_files: BTreeMap<String, String>,
}

pub async fn register(State(state): State<Arc<AppState>>, Path(name): Path<String>, Json(request): Json<RegisterRequest>) -> Response {
    match sentinela_controller::requests::monitor_register(state.store.as_ref(), &name, &request.monitor_code, request.additional_files).await {
        Ok(monitor) => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "monitor_registered", "monitor_id": monitor.id })),
        )
            .into_response(),
        Err(sentinela_monitor::RegisterError::Validation(error)) => (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "status": "error", "message": error.message, "errors": error.errors })),
        )
            .into_response(),
        Err(sentinela_monitor::RegisterError::Store(error)) => {
            tracing::error!(%error, "failed to register monitor");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

pub async fn enable(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    respond_to_toggle(sentinela_controller::requests::enable_monitor(state.store.as_ref(), &name).await)
}

pub async fn disable(State(state): State<Arc<AppState>>, Path(name): Path<String>) -> Response {
    respond_to_toggle(sentinela_controller::requests::disable_monitor(state.store.as_ref(), &name).await)
}

fn respond_to_toggle(result: sentinela_core::SentinelaResult<String>) -> Response {
    match result {
        Ok(message) => (StatusCode::OK, Json(serde_json::json!({ "status": "ok", "message": message }))).into_response(),
        Err(error) if error.kind == sentinela_core::ErrorKind::NotFound => StatusCode::NOT_FOUND.into_response(),
        Err(error) => {
            tracing::error!(%error, "monitor enable/disable failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
