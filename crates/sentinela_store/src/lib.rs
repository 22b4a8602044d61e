//! The Store contract: typed CRUD for Monitors, CodeModules, Issues,
//! Alerts, Notifications, Variables, Events, MonitorExecutions, plus the
//! two algorithmic contracts the core depends on (unique constraints,
//! "active rows per monitor" queries).
//!
//! This crate ships a default `InMemoryStore` (sufficient for tests and
//! single-node operation) and, behind `postgres-store`, a thin
//! `sqlx`-backed sketch — the persistence layer itself is out of scope per
//! `spec.md` §1 ("described by contracts, not implementations").

pub mod memory;
#[cfg(feature = "postgres-store")]
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinela_core::models::{
    Alert, AlertId, CodeModule, Event, Issue, IssueId, Monitor, MonitorExecution, MonitorId,
    Notification, NotificationId, Variable,
};
use sentinela_core::SentinelaResult;

/// Typed CRUD for every entity the core reasons about, plus the
/// "active issues/alerts per monitor" queries the Executor relies on.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get_monitor(&self, id: MonitorId) -> SentinelaResult<Option<Monitor>>;
    async fn get_monitor_by_name(&self, name: &str) -> SentinelaResult<Option<Monitor>>;
    async fn list_monitors(&self) -> SentinelaResult<Vec<Monitor>>;
    /// Enforces the `Monitors.name` unique constraint.
    async fn create_monitor(&self, name: &str) -> SentinelaResult<Monitor>;
    async fn save_monitor(&self, monitor: &Monitor) -> SentinelaResult<()>;

    async fn get_code_module(&self, monitor_id: MonitorId) -> SentinelaResult<Option<CodeModule>>;
    async fn save_code_module(&self, module: CodeModule) -> SentinelaResult<()>;
    /// CodeModules whose `registered_at` is newer than `reference`, among
    /// `monitor_ids` — the Loader's "pick up updates" query.
    async fn get_updated_code_modules(
        &self,
        monitor_ids: &[MonitorId],
        reference: DateTime<Utc>,
    ) -> SentinelaResult<Vec<CodeModule>>;

    /// Partial-index-backed: Issues with `status='active'` for one monitor.
    async fn active_issues(&self, monitor_id: MonitorId) -> SentinelaResult<Vec<Issue>>;
    /// Partial-index-backed: the (at most one) `status='active'` Alert for
    /// one monitor.
    async fn active_alert(&self, monitor_id: MonitorId) -> SentinelaResult<Option<Alert>>;

    async fn get_issue(&self, id: IssueId) -> SentinelaResult<Option<Issue>>;
    async fn insert_issue(&self, issue: Issue) -> SentinelaResult<Issue>;
    async fn save_issue(&self, issue: &Issue) -> SentinelaResult<()>;

    async fn get_alert(&self, id: AlertId) -> SentinelaResult<Option<Alert>>;
    async fn insert_alert(&self, alert: Alert) -> SentinelaResult<Alert>;
    async fn save_alert(&self, alert: &Alert) -> SentinelaResult<()>;

    /// Enforces `Notifications(alert_id, target)` unique constraint.
    async fn save_notification(&self, notification: Notification) -> SentinelaResult<Notification>;
    async fn notifications_for_alert(&self, alert_id: AlertId) -> SentinelaResult<Vec<Notification>>;
    async fn close_notification(&self, id: NotificationId) -> SentinelaResult<()>;

    async fn get_variable(&self, monitor_id: MonitorId, name: &str) -> SentinelaResult<Option<Variable>>;
    /// Enforces `(Variables.monitor_id, Variables.name)` unique constraint
    /// (upsert semantics: create-or-update).
    async fn set_variable(&self, monitor_id: MonitorId, name: &str, value: &str) -> SentinelaResult<()>;

    async fn record_execution(&self, execution: MonitorExecution) -> SentinelaResult<MonitorExecution>;

    /// Append an Event; enforces `Events(event_type, model, model_id)`
    /// uniqueness. Returns `None` (not an error) when the key already
    /// exists, so emission is idempotent for the caller.
    async fn append_event(&self, event: Event) -> SentinelaResult<Option<Event>>;

    /// Monitors whose `queued_at`/`running_at` is older than `tolerance`
    /// with no matching finish — the `monitors_stuck` procedure's query.
    async fn stuck_monitors(&self, tolerance: chrono::Duration, now: DateTime<Utc>) -> SentinelaResult<Vec<Monitor>>;
}
