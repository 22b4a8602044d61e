//! The Controller's trigger loop (`spec.md` §4.1): on `controller_process_
//! schedule`, examine every known Monitor and enqueue a `process_monitor`
//! message whenever it's enabled, idle, and at least one of its own crons
//! has fired.

use chrono::{DateTime, Utc};
use sentinela_core::cron::CronSchedule;
use sentinela_monitor::MonitorRegistry;
use sentinela_queue::{MonitorTask, ProcessMonitorPayload, Queue, MESSAGE_TYPE_PROCESS_MONITOR};
use sentinela_store::Store;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Runs the conjunction in `spec.md` §4.1 for one Monitor and returns the
/// `tasks` list to enqueue, or `None` if nothing is triggered.
pub fn tasks_for_monitor(
    enabled: bool,
    queued: bool,
    running: bool,
    search_cron: Option<&CronSchedule>,
    search_executed_at: Option<DateTime<Utc>>,
    update_cron: Option<&CronSchedule>,
    update_executed_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<Vec<MonitorTask>> {
    if !enabled || queued || running {
        return None;
    }

    let mut tasks = Vec::new();
    if let Some(cron) = search_cron {
        if cron.is_triggered(search_executed_at, now) {
            tasks.push(MonitorTask::Search);
        }
    }
    if let Some(cron) = update_cron {
        if cron.is_triggered(update_executed_at, now) {
            tasks.push(MonitorTask::Update);
        }
    }

    if tasks.is_empty() {
        None
    } else {
        Some(tasks)
    }
}

/// Owns the `controller_process_schedule` cron and the "last ran at" clock
/// `/status` reports against.
pub struct TriggerLoop {
    store: Arc<dyn Store>,
    queue: Arc<dyn Queue>,
    registry: Arc<MonitorRegistry>,
    schedule: CronSchedule,
    last_run: RwLock<Option<DateTime<Utc>>>,
}

impl TriggerLoop {
    pub fn new(store: Arc<dyn Store>, queue: Arc<dyn Queue>, registry: Arc<MonitorRegistry>, schedule: CronSchedule) -> Self {
        Self {
            store,
            queue,
            registry,
            schedule,
            last_run: RwLock::new(None),
        }
    }

    pub async fn last_run(&self) -> Option<DateTime<Utc>> {
        *self.last_run.read().await
    }

    /// One tick: examine every Monitor, enqueue triggered work. Not atomic
    /// with the `queued`/`queued_at` write per monitor — `spec.md` §4.1
    /// accepts a lost message as the worst case, rescued by
    /// `monitors_stuck`.
    pub async fn tick(&self, now: DateTime<Utc>) -> sentinela_core::SentinelaResult<usize> {
        let monitors = self.store.list_monitors().await?;
        let mut enqueued = 0;

        for mut monitor in monitors {
            let Some(implementation) = self.registry.resolve(monitor.id) else {
                continue;
            };
            let options = implementation.monitor_options();

            let search_cron = options
                .search_cron
                .as_deref()
                .and_then(|expr| CronSchedule::parse(expr, parse_tz(&options.time_zone)).ok());
            let update_cron = options
                .update_cron
                .as_deref()
                .and_then(|expr| CronSchedule::parse(expr, parse_tz(&options.time_zone)).ok());

            let Some(tasks) = tasks_for_monitor(
                monitor.enabled,
                monitor.queued,
                monitor.running,
                search_cron.as_ref(),
                monitor.search_executed_at,
                update_cron.as_ref(),
                monitor.update_executed_at,
                now,
            ) else {
                continue;
            };

            self.queue
                .send_message(
                    MESSAGE_TYPE_PROCESS_MONITOR,
                    serde_json::to_value(ProcessMonitorPayload { monitor_id: monitor.id, tasks })?,
                )
                .await?;

            monitor.mark_queued(now);
            self.store.save_monitor(&monitor).await?;
            enqueued += 1;
        }

        *self.last_run.write().await = Some(now);
        Ok(enqueued)
    }

    pub fn schedule(&self) -> &CronSchedule {
        &self.schedule
    }
}

fn parse_tz(name: &str) -> chrono_tz::Tz {
    name.parse().unwrap_or(chrono_tz::UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn disabled_monitor_never_triggers() {
        let cron = CronSchedule::parse("* * * * * *", chrono_tz::UTC).unwrap();
        let now = Utc::now();
        let result = tasks_for_monitor(false, false, false, Some(&cron), None, None, None, now);
        assert!(result.is_none());
    }

    #[test]
    fn queued_or_running_monitor_never_triggers() {
        let cron = CronSchedule::parse("* * * * * *", chrono_tz::UTC).unwrap();
        let now = Utc::now();
        assert!(tasks_for_monitor(true, true, false, Some(&cron), None, None, None, now).is_none());
        assert!(tasks_for_monitor(true, false, true, Some(&cron), None, None, None, now).is_none());
    }

    #[test]
    fn triggers_search_when_its_cron_fires() {
        let cron = CronSchedule::parse("0 * * * * *", chrono_tz::UTC).unwrap();
        let now = Utc::now();
        let last = now - Duration::hours(1);
        let tasks = tasks_for_monitor(true, false, false, Some(&cron), Some(last), None, None, now).unwrap();
        assert_eq!(tasks, vec![MonitorTask::Search]);
    }

    #[test]
    fn triggers_both_when_both_crons_fire() {
        let cron = CronSchedule::parse("0 * * * * *", chrono_tz::UTC).unwrap();
        let now = Utc::now();
        let last = now - Duration::hours(1);
        let tasks = tasks_for_monitor(true, false, false, Some(&cron), Some(last), Some(&cron), Some(last), now).unwrap();
        assert_eq!(tasks, vec![MonitorTask::Search, MonitorTask::Update]);
    }
}
