//! Periodic health checks (`spec.md` §4.4), ported from
//! `components/controller/procedures.py`. Currently one concrete
//! procedure, `monitors_stuck`, each on its own cron schedule pulled from
//! `controller_procedures` in configs.

use chrono::{DateTime, Duration, Utc};
use sentinela_config::ControllerProcedureConfig;
use sentinela_core::cron::CronSchedule;
use sentinela_core::SentinelaResult;
use sentinela_store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Clears `queued`/`running` on any Monitor stuck past `time_tolerance`
/// seconds, same remedy as the original: a monitor abandoned mid-execution
/// (crash, process kill) would otherwise never be picked up again.
pub async fn monitors_stuck(store: &dyn Store, time_tolerance: i64, now: DateTime<Utc>) -> SentinelaResult<()> {
    let stuck = store.stuck_monitors(Duration::seconds(time_tolerance), now).await?;

    for mut monitor in stuck {
        monitor.clear_flags();
        store.save_monitor(&monitor).await?;
        tracing::warn!(monitor = %monitor.name, "monitors_stuck: monitor was stuck and now it's fixed");
    }

    Ok(())
}

fn time_tolerance_seconds(params: Option<&serde_json::Map<String, serde_json::Value>>) -> i64 {
    params
        .and_then(|p| p.get("time_tolerance"))
        .and_then(|v| v.as_i64())
        .unwrap_or(1800)
}

/// Runs every configured procedure on its own cron, tracking each one's
/// `last_executions` entry independently (mirrors the Python module-level
/// `last_executions` dict).
pub struct ProceduresRunner {
    store: Arc<dyn Store>,
    procedures: HashMap<String, ControllerProcedureConfig>,
    last_executions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl ProceduresRunner {
    pub fn new(store: Arc<dyn Store>, procedures: HashMap<String, ControllerProcedureConfig>) -> Self {
        Self {
            store,
            procedures,
            last_executions: RwLock::new(HashMap::new()),
        }
    }

    pub async fn last_execution(&self, name: &str) -> Option<DateTime<Utc>> {
        self.last_executions.read().await.get(name).copied()
    }

    /// Each configured procedure's own schedule, parsed, for the
    /// diagnostics check ("is any procedure overdue"). Skips entries whose
    /// cron expression fails to parse; `tick` already logs those.
    pub fn schedules(&self) -> Vec<(String, CronSchedule)> {
        self.procedures
            .iter()
            .filter_map(|(name, settings)| {
                CronSchedule::parse(&settings.schedule, chrono_tz::UTC)
                    .ok()
                    .map(|schedule| (name.clone(), schedule))
            })
            .collect()
    }

    /// Checks every configured procedure's schedule against its own
    /// `last_execution` and runs the ones that are triggered. A procedure
    /// name with no matching implementation is skipped with a warning,
    /// same as an unknown entry in the original `procedures` dict would be.
    pub async fn tick(&self, now: DateTime<Utc>) {
        for (name, settings) in &self.procedures {
            let last_execution = self.last_execution(name).await;

            let triggered = match CronSchedule::parse(&settings.schedule, chrono_tz::UTC) {
                Ok(schedule) => schedule.is_triggered(last_execution, now),
                Err(error) => {
                    tracing::error!(procedure = %name, %error, "invalid procedure schedule");
                    continue;
                }
            };

            if !triggered {
                continue;
            }

            self.execute(name, settings, now).await;
        }
    }

    async fn execute(&self, name: &str, settings: &ControllerProcedureConfig, now: DateTime<Utc>) {
        let result = match name {
            "monitors_stuck" => {
                let tolerance = time_tolerance_seconds(settings.params.as_ref());
                monitors_stuck(self.store.as_ref(), tolerance, now).await
            }
            other => {
                tracing::warn!(procedure = %other, "no implementation registered for this procedure");
                Ok(())
            }
        };

        if let Err(error) = result {
            tracing::error!(procedure = %name, %error, "procedure execution failed");
        }

        self.last_executions.write().await.insert(name.to_string(), now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinela_store::memory::InMemoryStore;

    #[tokio::test]
    async fn monitors_stuck_clears_flags_and_saves() {
        let store = InMemoryStore::new();
        let mut monitor = store.create_monitor("stuck_one").await.unwrap();
        let now = Utc::now();
        monitor.mark_queued(now - Duration::hours(1));
        monitor.mark_running(now - Duration::hours(1));
        store.save_monitor(&monitor).await.unwrap();

        monitors_stuck(&store, 1800, now).await.unwrap();

        let reloaded = store.get_monitor(monitor.id).await.unwrap().unwrap();
        assert!(!reloaded.queued);
        assert!(!reloaded.running);
    }

    #[tokio::test]
    async fn runner_executes_triggered_procedure_once_per_tick() {
        let store = Arc::new(InMemoryStore::new());
        let mut monitor = store.create_monitor("stuck_two").await.unwrap();
        let now = Utc::now();
        monitor.mark_queued(now - Duration::hours(2));
        monitor.mark_running(now - Duration::hours(2));
        store.save_monitor(&monitor).await.unwrap();

        let mut procedures = HashMap::new();
        procedures.insert(
            "monitors_stuck".to_string(),
            ControllerProcedureConfig {
                schedule: "* * * * * *".to_string(),
                params: Some(serde_json::json!({"time_tolerance": 1800}).as_object().unwrap().clone()),
            },
        );

        let runner = ProceduresRunner::new(store.clone(), procedures);
        assert!(runner.last_execution("monitors_stuck").await.is_none());

        runner.tick(now).await;

        assert_eq!(runner.last_execution("monitors_stuck").await, Some(now));
        let reloaded = store.get_monitor(monitor.id).await.unwrap().unwrap();
        assert!(!reloaded.running);
    }

    #[tokio::test]
    async fn unknown_procedure_name_is_skipped_without_panicking() {
        let store = Arc::new(InMemoryStore::new());
        let mut procedures = HashMap::new();
        procedures.insert(
            "not_a_real_procedure".to_string(),
            ControllerProcedureConfig {
                schedule: "* * * * * *".to_string(),
                params: None,
            },
        );

        let runner = ProceduresRunner::new(store, procedures);
        runner.tick(Utc::now()).await;
        assert!(runner.last_execution("not_a_real_procedure").await.is_some());
    }
}
