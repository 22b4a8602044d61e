//! In-process `Store` implementation backed by `tokio::sync::RwLock`-guarded
//! maps, grounded on the teacher's `DatabaseManager` pool-guarding pattern
//! (`crates/aria_runtime/src/database/mod.rs`: `Arc<RwLock<...>>` state).
//! Every unique-constraint and partial-index guarantee the trait documents
//! is enforced here as an in-process invariant check on write.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sentinela_core::errors::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use sentinela_core::models::{
    Alert, AlertId, AlertStatus, CodeModule, Event, Issue, IssueId, IssueStatus, Monitor,
    MonitorExecution, MonitorId, Notification, NotificationId, NotificationStatus, Variable,
};
use sentinela_core::SentinelaResult;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Store;

#[derive(Default)]
struct Inner {
    monitors: HashMap<MonitorId, Monitor>,
    monitor_names: HashSet<String>,
    code_modules: HashMap<MonitorId, CodeModule>,
    issues: HashMap<IssueId, Issue>,
    alerts: HashMap<AlertId, Alert>,
    notifications: HashMap<NotificationId, Notification>,
    variables: HashMap<(MonitorId, String), Variable>,
    executions: Vec<MonitorExecution>,
    events: HashMap<(String, String, i64), Event>,

    next_monitor_id: i64,
    next_issue_id: i64,
    next_alert_id: i64,
    next_notification_id: i64,
    next_execution_id: i64,
    next_event_id: i64,
}

/// Default Store for tests and single-node deployments.
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }
}

#[async_trait]
impl Store for InMemoryStore {
    async fn get_monitor(&self, id: MonitorId) -> SentinelaResult<Option<Monitor>> {
        Ok(self.inner.read().await.monitors.get(&id).cloned())
    }

    async fn get_monitor_by_name(&self, name: &str) -> SentinelaResult<Option<Monitor>> {
        Ok(self
            .inner
            .read()
            .await
            .monitors
            .values()
            .find(|m| m.name == name)
            .cloned())
    }

    async fn list_monitors(&self) -> SentinelaResult<Vec<Monitor>> {
        Ok(self.inner.read().await.monitors.values().cloned().collect())
    }

    async fn create_monitor(&self, name: &str) -> SentinelaResult<Monitor> {
        let mut inner = self.inner.write().await;
        if inner.monitor_names.contains(name) {
            return Err(SentinelaError::new(
                ErrorKind::UniqueViolation,
                ErrorCategory::Store,
                ErrorSeverity::Low,
                format!("monitor name '{name}' already registered"),
            ));
        }
        inner.next_monitor_id += 1;
        let id = inner.next_monitor_id;
        let monitor = Monitor::new(id, name);
        inner.monitor_names.insert(name.to_string());
        inner.monitors.insert(id, monitor.clone());
        Ok(monitor)
    }

    async fn save_monitor(&self, monitor: &Monitor) -> SentinelaResult<()> {
        let mut inner = self.inner.write().await;
        inner.monitors.insert(monitor.id, monitor.clone());
        Ok(())
    }

    async fn get_code_module(&self, monitor_id: MonitorId) -> SentinelaResult<Option<CodeModule>> {
        Ok(self.inner.read().await.code_modules.get(&monitor_id).cloned())
    }

    async fn save_code_module(&self, module: CodeModule) -> SentinelaResult<()> {
        self.inner.write().await.code_modules.insert(module.monitor_id, module);
        Ok(())
    }

    async fn get_updated_code_modules(
        &self,
        monitor_ids: &[MonitorId],
        reference: DateTime<Utc>,
    ) -> SentinelaResult<Vec<CodeModule>> {
        let inner = self.inner.read().await;
        Ok(monitor_ids
            .iter()
            .filter_map(|id| inner.code_modules.get(id))
            .filter(|module| module.registered_at > reference)
            .cloned()
            .collect())
    }

    async fn active_issues(&self, monitor_id: MonitorId) -> SentinelaResult<Vec<Issue>> {
        Ok(self
            .inner
            .read()
            .await
            .issues
            .values()
            .filter(|i| i.monitor_id == monitor_id && i.status == IssueStatus::Active)
            .cloned()
            .collect())
    }

    async fn active_alert(&self, monitor_id: MonitorId) -> SentinelaResult<Option<Alert>> {
        Ok(self
            .inner
            .read()
            .await
            .alerts
            .values()
            .find(|a| a.monitor_id == monitor_id && a.status == AlertStatus::Active)
            .cloned())
    }

    async fn get_issue(&self, id: IssueId) -> SentinelaResult<Option<Issue>> {
        Ok(self.inner.read().await.issues.get(&id).cloned())
    }

    async fn insert_issue(&self, mut issue: Issue) -> SentinelaResult<Issue> {
        let mut inner = self.inner.write().await;

        // (monitor_id, model_id) uniqueness among active issues.
        let duplicate = inner.issues.values().any(|existing| {
            existing.monitor_id == issue.monitor_id
                && existing.model_id == issue.model_id
                && existing.status == IssueStatus::Active
        });
        if duplicate {
            return Err(SentinelaError::new(
                ErrorKind::UniqueViolation,
                ErrorCategory::Store,
                ErrorSeverity::Low,
                format!(
                    "active issue for monitor {} model_id '{}' already exists",
                    issue.monitor_id, issue.model_id
                ),
            ));
        }

        inner.next_issue_id += 1;
        issue.id = inner.next_issue_id;
        inner.issues.insert(issue.id, issue.clone());
        Ok(issue)
    }

    async fn save_issue(&self, issue: &Issue) -> SentinelaResult<()> {
        self.inner.write().await.issues.insert(issue.id, issue.clone());
        Ok(())
    }

    async fn get_alert(&self, id: AlertId) -> SentinelaResult<Option<Alert>> {
        Ok(self.inner.read().await.alerts.get(&id).cloned())
    }

    async fn insert_alert(&self, mut alert: Alert) -> SentinelaResult<Alert> {
        let mut inner = self.inner.write().await;

        let duplicate_active = inner
            .alerts
            .values()
            .any(|existing| existing.monitor_id == alert.monitor_id && existing.status == AlertStatus::Active);
        if duplicate_active {
            return Err(SentinelaError::new(
                ErrorKind::UniqueViolation,
                ErrorCategory::Store,
                ErrorSeverity::Low,
                format!("monitor {} already has an active alert", alert.monitor_id),
            ));
        }

        inner.next_alert_id += 1;
        alert.id = inner.next_alert_id;
        inner.alerts.insert(alert.id, alert.clone());
        Ok(alert)
    }

    async fn save_alert(&self, alert: &Alert) -> SentinelaResult<()> {
        self.inner.write().await.alerts.insert(alert.id, alert.clone());
        Ok(())
    }

    async fn save_notification(&self, mut notification: Notification) -> SentinelaResult<Notification> {
        let mut inner = self.inner.write().await;

        let duplicate = inner.notifications.values().any(|existing| {
            existing.alert_id == notification.alert_id && existing.target == notification.target
        });
        if duplicate {
            return Err(SentinelaError::new(
                ErrorKind::UniqueViolation,
                ErrorCategory::Store,
                ErrorSeverity::Low,
                format!(
                    "notification for alert {} target '{}' already exists",
                    notification.alert_id, notification.target
                ),
            ));
        }

        inner.next_notification_id += 1;
        notification.id = inner.next_notification_id;
        inner.notifications.insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn notifications_for_alert(&self, alert_id: AlertId) -> SentinelaResult<Vec<Notification>> {
        Ok(self
            .inner
            .read()
            .await
            .notifications
            .values()
            .filter(|n| n.alert_id == alert_id)
            .cloned()
            .collect())
    }

    async fn close_notification(&self, id: NotificationId) -> SentinelaResult<()> {
        let mut inner = self.inner.write().await;
        if let Some(notification) = inner.notifications.get_mut(&id) {
            notification.status = NotificationStatus::Closed;
            notification.closed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn get_variable(&self, monitor_id: MonitorId, name: &str) -> SentinelaResult<Option<Variable>> {
        Ok(self
            .inner
            .read()
            .await
            .variables
            .get(&(monitor_id, name.to_string()))
            .cloned())
    }

    async fn set_variable(&self, monitor_id: MonitorId, name: &str, value: &str) -> SentinelaResult<()> {
        let mut inner = self.inner.write().await;
        let key = (monitor_id, name.to_string());
        let now = Utc::now();
        inner
            .variables
            .entry(key)
            .and_modify(|v| {
                v.value = value.to_string();
                v.updated_at = now;
            })
            .or_insert_with(|| Variable {
                monitor_id,
                name: name.to_string(),
                value: value.to_string(),
                updated_at: now,
            });
        Ok(())
    }

    async fn record_execution(&self, mut execution: MonitorExecution) -> SentinelaResult<MonitorExecution> {
        let mut inner = self.inner.write().await;
        inner.next_execution_id += 1;
        execution.id = inner.next_execution_id;
        inner.executions.push(execution.clone());
        Ok(execution)
    }

    async fn append_event(&self, mut event: Event) -> SentinelaResult<Option<Event>> {
        let mut inner = self.inner.write().await;
        let key = event.key();
        if inner.events.contains_key(&key) {
            return Ok(None);
        }
        inner.next_event_id += 1;
        event.id = inner.next_event_id;
        inner.events.insert(key, event.clone());
        Ok(Some(event))
    }

    async fn stuck_monitors(&self, tolerance: chrono::Duration, now: DateTime<Utc>) -> SentinelaResult<Vec<Monitor>> {
        let inner = self.inner.read().await;
        Ok(inner
            .monitors
            .values()
            .filter(|m| {
                let queued_stuck = m
                    .queued_at
                    .map(|t| now - t > tolerance)
                    .unwrap_or(false);
                let running_stuck = m
                    .running_at
                    .map(|t| now - t > tolerance)
                    .unwrap_or(false);
                (m.queued && queued_stuck) || (m.running && running_stuck)
            })
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn monitor_name_uniqueness_enforced() {
        let store = InMemoryStore::new();
        store.create_monitor("m").await.unwrap();
        let err = store.create_monitor("m").await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
    }

    #[tokio::test]
    async fn active_issue_model_id_uniqueness_enforced() {
        let store = InMemoryStore::new();
        let monitor = store.create_monitor("m").await.unwrap();
        let issue = Issue::new(0, monitor.id, "a", serde_json::json!({}), Utc::now());
        store.insert_issue(issue.clone()).await.unwrap();
        let err = store.insert_issue(issue).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
    }

    #[tokio::test]
    async fn event_append_is_idempotent_by_key() {
        let store = InMemoryStore::new();
        let event = sentinela_core::events::new_event("issue_created", "Issue", 1, 1, serde_json::json!({}));
        let first = store.append_event(event.clone()).await.unwrap();
        assert!(first.is_some());
        let second = store.append_event(event).await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn at_most_one_active_alert_per_monitor() {
        let store = InMemoryStore::new();
        let monitor = store.create_monitor("m").await.unwrap();
        let alert = Alert::new(0, monitor.id, None, Utc::now());
        store.insert_alert(alert.clone()).await.unwrap();
        let err = store.insert_alert(alert).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::UniqueViolation);
    }
}
