//! `GET /` / `GET /status` (`spec.md` §6): aggregated health combining the
//! Controller's trigger-loop/procedures diagnostics with the Executor's
//! queue-liveness diagnostics.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
pub struct ComponentStatus {
    pub status: &'static str,
    pub issues: Vec<String>,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub monitors_loaded: Vec<String>,
    pub components: Components,
}

#[derive(Serialize)]
pub struct Components {
    pub controller: Option<ComponentStatus>,
    pub executor: Option<ComponentStatus>,
}

fn render(status: sentinela_controller::Status) -> &'static str {
    match status {
        sentinela_controller::Status::Ok => "ok",
        sentinela_controller::Status::Degraded => "degraded",
    }
}

fn render_executor(status: sentinela_executor::Status) -> &'static str {
    match status {
        sentinela_executor::Status::Ok => "ok",
        sentinela_executor::Status::Degraded => "degraded",
    }
}

pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let now = Utc::now();

    let controller = match &state.controller {
        Some(controller) => {
            let diagnostics = controller.diagnostics(state.diagnostics_grace).await;
            Some(ComponentStatus {
                status: render(diagnostics.status),
                issues: diagnostics.issues,
            })
        }
        None => None,
    };

    let executor = match &state.executor {
        Some(executor) => {
            let diagnostics = sentinela_executor::executor_diagnostics(executor.last_poll_millis(), now, state.diagnostics_grace);
            Some(ComponentStatus {
                status: render_executor(diagnostics.status),
                issues: diagnostics.issues,
            })
        }
        None => None,
    };

    let degraded = controller.as_ref().is_some_and(|c| c.status == "degraded") || executor.as_ref().is_some_and(|e| e.status == "degraded");

    let monitor_ids = state.registry.registered_ids();
    let monitors_loaded = match state.store.list_monitors().await {
        Ok(monitors) => monitors
            .into_iter()
            .filter(|m| monitor_ids.contains(&m.id))
            .map(|m| m.name)
            .collect(),
        Err(error) => {
            tracing::warn!(%error, "status: failed to list monitors");
            Vec::new()
        }
    };

    Json(StatusResponse {
        status: if degraded { "degraded" } else { "ok" },
        monitors_loaded,
        components: Components { controller, executor },
    })
}
