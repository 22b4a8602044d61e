//! Issue lifecycle transitions: `active -> solved`, `active -> dropped`.
//!
//! `Issue.status=solved ⇔ Issue.solved_at ≠ null` (and analogously for
//! `dropped_at`) is maintained by construction: the only way to set
//! `solved_at`/`dropped_at` is through these functions, which always flip
//! both fields together.

use crate::events::{self, new_event};
use crate::models::{Event, Issue, IssueStatus, MonitorId};
use chrono::{DateTime, Utc};

/// Create a fresh `active` Issue from a `(model_id, data)` tuple produced by
/// `search`, plus the `issue_created` Event.
pub fn create(id: i64, monitor_id: MonitorId, model_id: &str, data: serde_json::Value, now: DateTime<Utc>) -> (Issue, Event) {
    let issue = Issue::new(id, monitor_id, model_id, data.clone(), now);
    let event = new_event(events::ISSUE_CREATED, events::MODEL_ISSUE, issue.id, monitor_id, data);
    (issue, event)
}

/// Apply the result of `update(data)` to an issue's cached data, without
/// changing its status (that's decided separately by `is_solved`).
pub fn apply_update(issue: &mut Issue, new_data: serde_json::Value) {
    issue.data = new_data;
}

/// Transition `active -> solved` when `is_solved(data)` returned true.
/// No-op (returns `None`) if the issue isn't active.
pub fn solve(issue: &mut Issue, now: DateTime<Utc>) -> Option<Event> {
    if !issue.is_active() {
        return None;
    }
    issue.status = IssueStatus::Solved;
    issue.solved_at = Some(now);
    Some(new_event(
        events::ISSUE_SOLVED,
        events::MODEL_ISSUE,
        issue.id,
        issue.monitor_id,
        issue.data.clone(),
    ))
}

/// Transition `active -> dropped`, used by `issue_drop` requests and by
/// `alert_solve` force-dropping all linked active issues. No-op if the
/// issue isn't active (idempotent re-delivery).
pub fn drop_issue(issue: &mut Issue, now: DateTime<Utc>) -> Option<Event> {
    if !issue.is_active() {
        return None;
    }
    issue.status = IssueStatus::Dropped;
    issue.dropped_at = Some(now);
    Some(new_event(
        events::ISSUE_DROPPED,
        events::MODEL_ISSUE,
        issue.id,
        issue.monitor_id,
        issue.data.clone(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn solve_sets_both_fields_together() {
        let (mut issue, _) = create(1, 10, "a", json!({}), Utc::now());
        let event = solve(&mut issue, Utc::now()).unwrap();
        assert_eq!(issue.status, IssueStatus::Solved);
        assert!(issue.solved_at.is_some());
        assert_eq!(event.event_type, events::ISSUE_SOLVED);
    }

    #[test]
    fn solve_is_idempotent() {
        let (mut issue, _) = create(1, 10, "a", json!({}), Utc::now());
        solve(&mut issue, Utc::now());
        assert!(solve(&mut issue, Utc::now()).is_none());
    }

    #[test]
    fn drop_is_idempotent() {
        let (mut issue, _) = create(1, 10, "a", json!({}), Utc::now());
        assert!(drop_issue(&mut issue, Utc::now()).is_some());
        assert!(drop_issue(&mut issue, Utc::now()).is_none());
    }
}
