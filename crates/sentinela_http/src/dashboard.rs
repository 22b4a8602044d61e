//! `GET /dashboard/*` (`spec.md` §4.1 [ADD]): read-only summaries, ported
//! from `components/http_server/dashboard_routes.py`. These never enqueue
//! or mutate anything — plain Store reads.

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sentinela_core::models::{AlertId, MonitorId};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct MonitorRow {
    pub id: MonitorId,
    pub name: String,
    pub enabled: bool,
    pub running: bool,
    pub active_issue_count: usize,
    pub has_active_alert: bool,
}

pub async fn monitors(State(state): State<Arc<AppState>>) -> Result<Json<Vec<MonitorRow>>, StatusCode> {
    let monitors = state.store.list_monitors().await.map_err(|error| {
        tracing::error!(%error, "dashboard: failed to list monitors");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut rows = Vec::with_capacity(monitors.len());
    for monitor in monitors {
        let active_issues = state.store.active_issues(monitor.id).await.map_err(|error| {
            tracing::error!(%error, "dashboard: failed to load active issues");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;
        let active_alert = state.store.active_alert(monitor.id).await.map_err(|error| {
            tracing::error!(%error, "dashboard: failed to load active alert");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

        rows.push(MonitorRow {
            id: monitor.id,
            name: monitor.name,
            enabled: monitor.enabled,
            running: monitor.running,
            active_issue_count: active_issues.len(),
            has_active_alert: active_alert.is_some(),
        });
    }

    Ok(Json(rows))
}

#[derive(Serialize)]
pub struct AlertRow {
    pub id: AlertId,
    pub monitor_id: MonitorId,
    pub monitor_name: String,
    pub acknowledged: bool,
    pub locked: bool,
    pub priority: Option<sentinela_core::priority::Priority>,
}

pub async fn alerts(State(state): State<Arc<AppState>>) -> Result<Json<Vec<AlertRow>>, StatusCode> {
    let monitors = state.store.list_monitors().await.map_err(|error| {
        tracing::error!(%error, "dashboard: failed to list monitors");
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut rows = Vec::new();
    for monitor in monitors {
        if let Some(alert) = state.store.active_alert(monitor.id).await.map_err(|error| {
            tracing::error!(%error, "dashboard: failed to load active alert");
            StatusCode::INTERNAL_SERVER_ERROR
        })? {
            rows.push(AlertRow {
                id: alert.id,
                monitor_id: monitor.id,
                monitor_name: monitor.name,
                acknowledged: alert.acknowledged,
                locked: alert.locked,
                priority: alert.priority,
            });
        }
    }

    Ok(Json(rows))
}
