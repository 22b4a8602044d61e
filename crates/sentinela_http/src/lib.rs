//! The Controller-role admin HTTP API (`spec.md` §6): a thin axum layer
//! translating requests into Store reads and Queue writes. It never owns a
//! state-machine decision itself — `/alert/{id}/{action}` and
//! `/issue/{id}/drop` only enqueue a `request` message for the Executor to
//! apply, matching "Out of scope: The HTTP admin API (thin translation of
//! requests into commands/queue messages)" (`spec.md` §1).

pub mod action;
pub mod dashboard;
pub mod metrics;
pub mod monitor;
pub mod status;

use axum::routing::{get, post};
use axum::Router;
use sentinela_controller::Controller;
use sentinela_executor::Executor;
use sentinela_monitor::MonitorRegistry;
use sentinela_queue::Queue;
use sentinela_store::Store;
use std::sync::Arc;

/// Shared state every handler reads from: the Store (all reads and the
/// synchronous monitor-registration path), the Queue (only ever written
/// to, never read), the in-process `MonitorRegistry`, and handles to the
/// Controller/Executor roles for `/status`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub queue: Arc<dyn Queue>,
    pub registry: Arc<MonitorRegistry>,
    pub controller: Option<Arc<Controller>>,
    pub executor: Option<Arc<Executor>>,
    pub metrics: Arc<prometheus_client::registry::Registry>,
    pub diagnostics_grace: chrono::Duration,
}

/// Builds the full router: status/metrics, monitor registry, dashboard
/// reads, and the Alert/Issue action endpoints.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(status::status))
        .route("/status", get(status::status))
        .route("/metrics", get(metrics::metrics))
        .route("/monitor/list", get(monitor::list))
        .route("/monitor/validate", post(monitor::validate))
        .route("/monitor/register/:name", post(monitor::register))
        .route("/monitor/:name", get(monitor::get))
        .route("/monitor/:name/enable", post(monitor::enable))
        .route("/monitor/:name/disable", post(monitor::disable))
        .route("/alert/:id/acknowledge", post(action::alert_acknowledge))
        .route("/alert/:id/lock", post(action::alert_lock))
        .route("/alert/:id/solve", post(action::alert_solve))
        .route("/issue/:id/drop", post(action::issue_drop))
        .route("/dashboard/monitors", get(dashboard::monitors))
        .route("/dashboard/alerts", get(dashboard::alerts))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}
