//! Event names and the append-only `Event` factory.
//!
//! Every transition that must fan out reactions produces one `Event`, keyed
//! uniquely by `(event_type, model, model_id)`; duplicate emissions for the
//! same key are idempotent (the Store enforces the unique index, the
//! Executor just skips on conflict).

use crate::models::{Event, MonitorId};
use chrono::Utc;
use serde_json::Value;

pub const ISSUE_CREATED: &str = "issue_created";
pub const ISSUE_SOLVED: &str = "issue_solved";
pub const ISSUE_DROPPED: &str = "issue_dropped";
pub const ALERT_CREATED: &str = "alert_created";
pub const ALERT_UPDATED: &str = "alert_updated";
pub const ALERT_ACKNOWLEDGED: &str = "alert_acknowledged";
pub const ALERT_LOCKED: &str = "alert_locked";
pub const ALERT_SOLVED: &str = "alert_solved";

pub const MODEL_ISSUE: &str = "Issue";
pub const MODEL_ALERT: &str = "Alert";

/// Build an (unsaved, `id` unset) Event row. The Store assigns `id` on
/// insert and is responsible for rejecting/ignoring duplicate
/// `(event_type, model, model_id)` keys.
pub fn new_event(
    event_type: &str,
    model: &str,
    model_id: i64,
    monitor_id: MonitorId,
    payload: Value,
) -> Event {
    Event {
        id: 0,
        event_type: event_type.to_string(),
        model: model.to_string(),
        model_id,
        monitor_id,
        payload,
        created_at: Utc::now(),
    }
}
