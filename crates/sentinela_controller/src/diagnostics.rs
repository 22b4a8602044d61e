//! Controller health reporting for `GET /status` (`spec.md` §4.4, §5):
//! whether the trigger loop last ran within its own schedule's tolerance,
//! and whether any configured Procedure is overdue against its own.

use crate::procedures::ProceduresRunner;
use crate::trigger::TriggerLoop;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Degraded,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub status: Status,
    pub issues: Vec<String>,
}

/// A schedule is overdue once more than `grace` has elapsed past the
/// instant it should next have fired, relative to its last known run.
fn is_overdue(last_run: Option<DateTime<Utc>>, schedule: &sentinela_core::cron::CronSchedule, now: DateTime<Utc>, grace: chrono::Duration) -> bool {
    let Some(last_run) = last_run else {
        return false;
    };

    match schedule.time_until_next_trigger(last_run) {
        Some(until_next) => now - last_run > until_next + grace,
        None => false,
    }
}

pub async fn controller_diagnostics(trigger_loop: &TriggerLoop, procedures: &ProceduresRunner, now: DateTime<Utc>, grace: chrono::Duration) -> Diagnostics {
    let mut issues = Vec::new();

    let last_run = trigger_loop.last_run().await;
    if last_run.is_none() || is_overdue(last_run, trigger_loop.schedule(), now, grace) {
        issues.push("trigger loop has not run within its schedule's tolerance".to_string());
    }

    for (name, schedule) in procedures.schedules() {
        let last_execution = procedures.last_execution(name).await;
        if is_overdue(last_execution, &schedule, now, grace) {
            issues.push(format!("procedure '{name}' is overdue"));
        }
    }

    let status = if issues.is_empty() { Status::Ok } else { Status::Degraded };
    Diagnostics { status, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use sentinela_core::cron::CronSchedule;
    use sentinela_monitor::MonitorRegistry;
    use sentinela_queue::internal::InternalQueue;
    use sentinela_store::memory::InMemoryStore;
    use std::collections::HashMap;
    use std::sync::Arc;

    fn minute_schedule() -> CronSchedule {
        CronSchedule::parse("0 * * * * *", chrono_tz::UTC).unwrap()
    }

    #[tokio::test]
    async fn ok_when_trigger_loop_just_ran() {
        let store: Arc<dyn sentinela_store::Store> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn sentinela_queue::Queue> = Arc::new(InternalQueue::new(std::time::Duration::from_millis(10)));
        let registry = Arc::new(MonitorRegistry::new());
        let trigger_loop = TriggerLoop::new(store.clone(), queue, registry, minute_schedule());
        let now = Utc::now();
        trigger_loop.tick(now).await.unwrap();

        let procedures = ProceduresRunner::new(store, HashMap::new());
        let diagnostics = controller_diagnostics(&trigger_loop, &procedures, now, Duration::seconds(5)).await;
        assert_eq!(diagnostics.status, Status::Ok);
        assert!(diagnostics.issues.is_empty());
    }

    #[tokio::test]
    async fn degraded_when_trigger_loop_never_ran() {
        let store: Arc<dyn sentinela_store::Store> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn sentinela_queue::Queue> = Arc::new(InternalQueue::new(std::time::Duration::from_millis(10)));
        let registry = Arc::new(MonitorRegistry::new());
        let trigger_loop = TriggerLoop::new(store.clone(), queue, registry, minute_schedule());

        let procedures = ProceduresRunner::new(store, HashMap::new());
        let diagnostics = controller_diagnostics(&trigger_loop, &procedures, Utc::now(), Duration::seconds(5)).await;
        assert_eq!(diagnostics.status, Status::Degraded);
        assert_eq!(diagnostics.issues.len(), 1);
    }
}
