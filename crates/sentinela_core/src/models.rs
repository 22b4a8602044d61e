//! Typed rows for the entities the Store persists: Monitors, CodeModules,
//! Issues, Alerts, Notifications, Variables, Events, MonitorExecutions.
//!
//! These are plain data carriers; the state-machine transitions that mutate
//! them live in [`crate::alert_machine`] and [`crate::issue_machine`] so the
//! invariants stay in one place instead of scattered across callers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub type MonitorId = i64;
pub type IssueId = i64;
pub type AlertId = i64;
pub type NotificationId = i64;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum IssueStatus {
    Active,
    Dropped,
    Solved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum AlertStatus {
    Active,
    Solved,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum NotificationStatus {
    Active,
    Closed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ExecutionStatus {
    Success,
    Failed,
}

/// A registered user job. At most one of `queued`/`running` transitions is
/// driven by the Controller (`queued`) and Executor (`running`); both flags
/// may be cleared by the `monitors_stuck` procedure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    pub id: MonitorId,
    pub name: String,
    pub enabled: bool,
    pub queued: bool,
    pub running: bool,
    pub queued_at: Option<DateTime<Utc>>,
    pub running_at: Option<DateTime<Utc>>,
    pub search_executed_at: Option<DateTime<Utc>>,
    pub update_executed_at: Option<DateTime<Utc>>,
    pub last_heartbeat: Option<DateTime<Utc>>,

    /// Loaded at the start of every Executor task, never cached across
    /// tasks per §3: "must be reloaded ... the cache is discarded when the
    /// task ends."
    #[serde(skip)]
    pub active_issues: Vec<Issue>,
    #[serde(skip)]
    pub active_alert: Option<Alert>,
}

impl Monitor {
    pub fn new(id: MonitorId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            enabled: true,
            queued: false,
            running: false,
            queued_at: None,
            running_at: None,
            search_executed_at: None,
            update_executed_at: None,
            last_heartbeat: None,
            active_issues: Vec::new(),
            active_alert: None,
        }
    }

    pub fn mark_queued(&mut self, now: DateTime<Utc>) {
        self.queued = true;
        self.queued_at = Some(now);
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) {
        self.running = true;
        self.running_at = Some(now);
    }

    pub fn clear_flags(&mut self) {
        self.queued = false;
        self.running = false;
    }

    /// Active `model_id` set among currently-cached `active_issues`, used by
    /// `search` to decide which produced tuples are genuinely new.
    pub fn active_model_ids(&self) -> std::collections::HashSet<&str> {
        self.active_issues
            .iter()
            .map(|issue| issue.model_id.as_str())
            .collect()
    }
}

/// Source code and auxiliary files registered for a Monitor, one-to-one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeModule {
    pub monitor_id: MonitorId,
    pub code: String,
    pub additional_files: BTreeMap<String, String>,
    pub registered_at: DateTime<Utc>,
}

/// One observed problematic entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    pub monitor_id: MonitorId,
    pub alert_id: Option<AlertId>,
    pub model_id: String,
    pub status: IssueStatus,
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub solved_at: Option<DateTime<Utc>>,
    pub dropped_at: Option<DateTime<Utc>>,
}

impl Issue {
    pub fn new(id: IssueId, monitor_id: MonitorId, model_id: impl Into<String>, data: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id,
            monitor_id,
            alert_id: None,
            model_id: model_id.into(),
            status: IssueStatus::Active,
            data,
            created_at: now,
            solved_at: None,
            dropped_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, IssueStatus::Active)
    }
}

/// Aggregation of issues for a single monitor, carrying priority and
/// acknowledgement state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: AlertId,
    pub monitor_id: MonitorId,
    pub status: AlertStatus,
    pub acknowledged: bool,
    pub locked: bool,
    pub priority: Option<crate::priority::Priority>,
    pub acknowledge_priority: Option<crate::priority::Priority>,
    pub created_at: DateTime<Utc>,
    pub solved_at: Option<DateTime<Utc>>,
}

impl Alert {
    pub fn new(id: AlertId, monitor_id: MonitorId, priority: Option<crate::priority::Priority>, now: DateTime<Utc>) -> Self {
        Self {
            id,
            monitor_id,
            status: AlertStatus::Active,
            acknowledged: false,
            locked: false,
            priority,
            acknowledge_priority: None,
            created_at: now,
            solved_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.status, AlertStatus::Active)
    }
}

/// One delivery target attached to an Alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub alert_id: AlertId,
    pub target: String,
    pub notification_class: String,
    pub params: serde_json::Value,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
}

/// Named, per-monitor, mutable string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variable {
    pub monitor_id: MonitorId,
    pub name: String,
    pub value: String,
    pub updated_at: DateTime<Utc>,
}

/// Audit row per `search`/`update` attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorExecution {
    pub id: i64,
    pub monitor_id: MonitorId,
    pub task: String,
    pub status: ExecutionStatus,
    pub error_type: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Append-only log of state transitions keyed `(event_type, model,
/// model_id)` uniquely; fed to the reaction dispatcher.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub event_type: String,
    pub model: String,
    pub model_id: i64,
    pub monitor_id: MonitorId,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn key(&self) -> (String, String, i64) {
        (self.event_type.clone(), self.model.clone(), self.model_id)
    }
}
