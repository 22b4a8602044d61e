//! Alert state machine: `active -> active` (priority/ack/lock updates) and
//! `active -> solved`, per `spec.md` §4.2.3.
//!
//! States are `active`/`solved`; `acknowledged`/`locked` are orthogonal
//! booleans on top. Every transition here returns the `Event`s the caller
//! (the Executor) must persist and fan out to reactions.

use crate::events::{self, new_event};
use crate::models::{Alert, AlertId, AlertStatus, Issue, MonitorId};
use crate::priority::{Priority, Rule};
use chrono::{DateTime, Utc};

/// Outcome of recomputing an Alert's priority against its monitor's active
/// Issues.
pub enum Evaluation {
    /// No alert existed and no priority triggered (or no active issues):
    /// nothing to do.
    NoAlert,
    /// A new Alert was created; its active Issues were linked to it.
    Created(Alert, Vec<crate::models::Event>),
    /// An existing Alert's priority changed (escalation/de-escalation),
    /// `acknowledged` possibly cleared by re-escalation.
    Updated(Vec<crate::models::Event>),
    /// An existing Alert became solved because priority dropped to `None`
    /// or every linked issue is no longer active.
    Solved(Vec<crate::models::Event>),
    /// Recomputation changed nothing observable.
    Unchanged,
}

/// Compute priority over `active_issues` and apply the Alert transition
/// table. `active_issues` must already be filtered to this monitor's
/// `active`-status issues; issues without an `alert_id` are linked to a
/// newly created Alert.
#[allow(clippy::too_many_arguments)]
pub fn evaluate(
    existing: Option<&mut Alert>,
    active_issues: &mut [Issue],
    rule: &Rule,
    monitor_id: MonitorId,
    next_alert_id: impl FnOnce() -> AlertId,
    now: DateTime<Utc>,
) -> Evaluation {
    let new_priority = rule.calculate(active_issues, now);

    match existing {
        Some(alert) => {
            if !alert.is_active() {
                return Evaluation::Unchanged;
            }

            // At most one active Alert per monitor: any active Issue still
            // unlinked belongs to this one (invariant 2 in spec.md §8).
            for issue in active_issues.iter_mut() {
                if issue.alert_id.is_none() {
                    issue.alert_id = Some(alert.id);
                }
            }

            let linked_active_count = active_issues
                .iter()
                .filter(|i| i.alert_id == Some(alert.id))
                .count();

            if new_priority.is_none() || linked_active_count == 0 {
                return Evaluation::Solved(solve_alert(alert, now));
            }

            if alert.locked {
                return Evaluation::Unchanged;
            }

            if new_priority == alert.priority {
                return Evaluation::Unchanged;
            }

            let mut events = Vec::new();
            alert.priority = new_priority;

            if let (Some(new_p), Some(ack_p)) = (new_priority, alert.acknowledge_priority) {
                if new_p > ack_p {
                    alert.acknowledged = false;
                }
            }

            events.push(new_event(
                events::ALERT_UPDATED,
                events::MODEL_ALERT,
                alert.id,
                monitor_id,
                serde_json::json!({ "priority": new_priority }),
            ));
            Evaluation::Updated(events)
        }
        None => {
            if new_priority.is_none() || active_issues.is_empty() {
                return Evaluation::NoAlert;
            }

            let alert = Alert::new(next_alert_id(), monitor_id, new_priority, now);
            for issue in active_issues.iter_mut() {
                if issue.alert_id.is_none() {
                    issue.alert_id = Some(alert.id);
                }
            }

            let event = new_event(
                events::ALERT_CREATED,
                events::MODEL_ALERT,
                alert.id,
                monitor_id,
                serde_json::json!({ "priority": new_priority }),
            );
            Evaluation::Created(alert, vec![event])
        }
    }
}

fn solve_alert(alert: &mut Alert, now: DateTime<Utc>) -> Vec<crate::models::Event> {
    alert.status = AlertStatus::Solved;
    alert.solved_at = Some(now);
    vec![new_event(
        events::ALERT_SOLVED,
        events::MODEL_ALERT,
        alert.id,
        alert.monitor_id,
        serde_json::json!({}),
    )]
}

/// `alert_acknowledge(alert_id)` — idempotent: repeated delivery doesn't
/// change state further.
pub fn acknowledge(alert: &mut Alert) -> Option<crate::models::Event> {
    if !alert.is_active() || alert.acknowledged {
        return None;
    }
    alert.acknowledged = true;
    alert.acknowledge_priority = alert.priority;
    Some(new_event(
        events::ALERT_ACKNOWLEDGED,
        events::MODEL_ALERT,
        alert.id,
        alert.monitor_id,
        serde_json::json!({ "priority": alert.priority }),
    ))
}

/// `alert_lock(alert_id)` — idempotent.
pub fn lock(alert: &mut Alert) -> Option<crate::models::Event> {
    if !alert.is_active() || alert.locked {
        return None;
    }
    alert.locked = true;
    Some(new_event(
        events::ALERT_LOCKED,
        events::MODEL_ALERT,
        alert.id,
        alert.monitor_id,
        serde_json::json!({}),
    ))
}

/// `alert_solve(alert_id)` — force-solve: drops all linked active Issues
/// and solves the Alert. Returns `(issue_events, alert_event)`; idempotent
/// if the Alert is already solved.
pub fn force_solve(
    alert: &mut Alert,
    linked_active_issues: &mut [&mut Issue],
    now: DateTime<Utc>,
) -> (Vec<crate::models::Event>, Option<crate::models::Event>) {
    if !alert.is_active() {
        return (Vec::new(), None);
    }

    let mut issue_events = Vec::new();
    for issue in linked_active_issues.iter_mut() {
        if let Some(event) = crate::issue_machine::drop_issue(issue, now) {
            issue_events.push(event);
        }
    }

    let alert_events = solve_alert(alert, now);
    (issue_events, alert_events.into_iter().next())
}
