//! `process_monitor` task body (`spec.md` §4.2.1): guards, keepalive
//! heartbeat, `search` then `update` in that fixed order, Alert
//! evaluation + solve propagation, Event emission, and Reaction dispatch.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use sentinela_core::alert_machine::{self, Evaluation};
use sentinela_core::events;
use sentinela_core::issue_machine;
use sentinela_core::models::{Event, ExecutionStatus, MonitorExecution, MonitorId};
use sentinela_core::options::{ExecutionTimeouts, ReactionPayload};
use sentinela_core::SentinelaResult;
use sentinela_monitor::{Monitor, MonitorContext, MonitorRegistry};
use sentinela_queue::MonitorTask;
use sentinela_reactions::ReactionRegistry;
use sentinela_store::Store;
use sentinela_task::TaskManager;
use std::sync::Arc;

/// Runs every applicable task for `monitor_id`, end to end. Returns `Ok`
/// for every outcome the Queue contract treats as "delete the message" —
/// monitor/implementation not found, already running, user-code failure,
/// timeout — logging and recording a failed `MonitorExecution` along the
/// way. Only a Store/infrastructure error escapes as `Err`, so the caller
/// abandons the message for redelivery instead.
pub async fn process_monitor(
    store: Arc<dyn Store>,
    registry: Arc<MonitorRegistry>,
    reactions: Arc<ReactionRegistry>,
    task_manager: &TaskManager,
    monitor_id: MonitorId,
    tasks: &[MonitorTask],
    timeouts: &ExecutionTimeouts,
    max_issues_creation: u64,
    concurrency: usize,
) -> SentinelaResult<()> {
    let Some(mut monitor) = store.get_monitor(monitor_id).await? else {
        tracing::warn!(monitor_id, "process_monitor: monitor not found, dropping message");
        return Ok(());
    };

    let Some(implementation) = registry.resolve(monitor_id) else {
        tracing::warn!(monitor_id, "process_monitor: no implementation registered, dropping message");
        return Ok(());
    };

    if monitor.running {
        tracing::warn!(monitor_id, "process_monitor: monitor already running, dropping duplicate message");
        return Ok(());
    }

    let started_at = Utc::now();
    monitor.mark_running(started_at);
    store.save_monitor(&monitor).await?;

    // `keepalive_scope` is never itself a spawned task: it only exists as a
    // key so the keepalive loop below is registered as a "child" of
    // something we control, letting us cancel it precisely via
    // `wait_for_tasks` once `run_tasks` is done instead of leaving it
    // spinning forever (there is no other way to cancel a task by its own
    // id; only a parent's completion, or a `wait_for_tasks` timeout, does).
    let keepalive_scope = uuid::Uuid::new_v4();
    let keepalive_store = store.clone();
    let heartbeat_time = timeouts.monitor_heartbeat;
    task_manager.create_task("monitor_keepalive", Some(keepalive_scope), async move {
        loop {
            tokio::time::sleep(heartbeat_time).await;
            if let Some(mut monitor) = keepalive_store.get_monitor(monitor_id).await? {
                monitor.last_heartbeat = Some(Utc::now());
                keepalive_store.save_monitor(&monitor).await?;
            }
        }
    });

    let result = run_tasks(
        store.clone(),
        reactions,
        implementation,
        monitor_id,
        tasks,
        timeouts,
        max_issues_creation,
        concurrency,
    )
    .await;

    task_manager.wait_for_tasks(Some(keepalive_scope), Some(std::time::Duration::ZERO), true).await;

    monitor.clear_flags();
    store.save_monitor(&monitor).await?;

    result
}

async fn run_tasks(
    store: Arc<dyn Store>,
    reactions: Arc<ReactionRegistry>,
    implementation: Arc<dyn Monitor>,
    monitor_id: MonitorId,
    tasks: &[MonitorTask],
    timeouts: &ExecutionTimeouts,
    max_issues_creation: u64,
    concurrency: usize,
) -> SentinelaResult<()> {
    if tasks.contains(&MonitorTask::Search) {
        let max_issues_creation = implementation.issue_options().max_issues_creation.unwrap_or(max_issues_creation);
        run_search(store.clone(), reactions.as_ref(), implementation.as_ref(), monitor_id, timeouts, max_issues_creation).await?;
    }

    if tasks.contains(&MonitorTask::Update) {
        run_update(store.clone(), reactions.clone(), implementation.clone(), monitor_id, timeouts, concurrency).await?;
    }

    if implementation.alert_options().is_some() {
        evaluate_alert(store.as_ref(), reactions.as_ref(), implementation.as_ref(), monitor_id, timeouts).await?;
    }

    Ok(())
}

async fn record(store: &dyn Store, monitor_id: MonitorId, task: &str, status: ExecutionStatus, error_type: Option<String>, started_at: chrono::DateTime<Utc>) -> SentinelaResult<()> {
    store
        .record_execution(MonitorExecution {
            id: 0,
            monitor_id,
            task: task.to_string(),
            status,
            error_type,
            started_at,
            finished_at: Some(Utc::now()),
        })
        .await?;
    Ok(())
}

async fn run_search(
    store: Arc<dyn Store>,
    reactions: &ReactionRegistry,
    implementation: &dyn Monitor,
    monitor_id: MonitorId,
    timeouts: &ExecutionTimeouts,
    max_issues_creation: u64,
) -> SentinelaResult<()> {
    let started_at = Utc::now();
    let ctx = MonitorContext::new(monitor_id, store.clone());
    let outcome = tokio::time::timeout(timeouts.monitor, implementation.search(&ctx)).await;
    let store = store.as_ref();

    let results = match outcome {
        Ok(Ok(results)) => results,
        Ok(Err(error)) => {
            tracing::warn!(monitor_id, %error, "search failed");
            return record(store, monitor_id, "search", ExecutionStatus::Failed, Some("user_code_error".to_string()), started_at).await;
        }
        Err(_) => {
            tracing::warn!(monitor_id, "search timed out");
            return record(store, monitor_id, "search", ExecutionStatus::Failed, Some("timeout".to_string()), started_at).await;
        }
    };

    let active_issues = store.active_issues(monitor_id).await?;
    let mut known: std::collections::HashSet<String> = active_issues.into_iter().map(|issue| issue.model_id).collect();

    let mut created = 0u64;
    let mut over_budget = false;

    for (model_id, data) in results {
        if known.contains(&model_id) {
            continue;
        }
        if created >= max_issues_creation {
            over_budget = true;
            break;
        }

        let (issue, event) = issue_machine::create(0, monitor_id, &model_id, data, Utc::now());
        match store.insert_issue(issue).await {
            Ok(_) => {
                known.insert(model_id);
                created += 1;
                emit_and_react(store, reactions, Some(implementation), monitor_id, event, timeouts.reaction, 1).await?;
            }
            Err(error) => tracing::warn!(monitor_id, %model_id, %error, "failed to persist new issue"),
        }
    }

    if let Some(mut monitor) = store.get_monitor(monitor_id).await? {
        monitor.search_executed_at = Some(Utc::now());
        store.save_monitor(&monitor).await?;
    }

    if over_budget {
        tracing::warn!(monitor_id, max_issues_creation, "search produced more issues than the per-run budget");
        record(store, monitor_id, "search", ExecutionStatus::Failed, Some("too_many_issues_created".to_string()), started_at).await
    } else {
        record(store, monitor_id, "search", ExecutionStatus::Success, None, started_at).await
    }
}

async fn run_update(
    store: Arc<dyn Store>,
    reactions: Arc<ReactionRegistry>,
    implementation: Arc<dyn Monitor>,
    monitor_id: MonitorId,
    timeouts: &ExecutionTimeouts,
    concurrency: usize,
) -> SentinelaResult<()> {
    let started_at = Utc::now();
    let active_issues = store.active_issues(monitor_id).await?;

    let monitor_timeout = timeouts.monitor;
    let outcomes: Vec<_> = stream::iter(active_issues.into_iter().map(|issue| {
        let store = store.clone();
        let implementation = implementation.clone();
        async move {
            let ctx = MonitorContext::new(monitor_id, store);
            let result = tokio::time::timeout(monitor_timeout, implementation.update(&ctx, issue.data.clone())).await;
            (issue, result)
        }
    }))
    .buffer_unordered(concurrency.max(1))
    .collect()
    .await;

    let mut any_failed = false;

    for (mut issue, outcome) in outcomes {
        match outcome {
            Ok(Ok(new_data)) => {
                issue_machine::apply_update(&mut issue, new_data.clone());

                let ctx = MonitorContext::new(monitor_id, store.clone());
                if implementation.is_solved(&ctx, &new_data).await {
                    if let Some(event) = issue_machine::solve(&mut issue, Utc::now()) {
                        emit_and_react(store.as_ref(), reactions.as_ref(), Some(implementation.as_ref()), monitor_id, event, timeouts.reaction, 1).await?;
                    }
                }

                store.save_issue(&issue).await?;
            }
            Ok(Err(error)) => {
                any_failed = true;
                tracing::warn!(monitor_id, issue_id = issue.id, %error, "update failed");
            }
            Err(_) => {
                any_failed = true;
                tracing::warn!(monitor_id, issue_id = issue.id, "update timed out");
            }
        }
    }

    if let Some(mut monitor) = store.get_monitor(monitor_id).await? {
        monitor.update_executed_at = Some(Utc::now());
        store.save_monitor(&monitor).await?;
    }

    let status = if any_failed { ExecutionStatus::Failed } else { ExecutionStatus::Success };
    let error_type = any_failed.then(|| "user_code_error".to_string());
    record(store.as_ref(), monitor_id, "update", status, error_type, started_at).await
}

async fn evaluate_alert(
    store: &dyn Store,
    reactions: &ReactionRegistry,
    implementation: &dyn Monitor,
    monitor_id: MonitorId,
    timeouts: &ExecutionTimeouts,
) -> SentinelaResult<()> {
    let alert_options = implementation.alert_options().expect("checked by caller");
    let mut active_issues = store.active_issues(monitor_id).await?;
    let mut existing_alert = store.active_alert(monitor_id).await?;
    let now = Utc::now();

    let outcome = alert_machine::evaluate(existing_alert.as_mut(), &mut active_issues, &alert_options.rule, monitor_id, || 0, now);

    match outcome {
        Evaluation::NoAlert | Evaluation::Unchanged => Ok(()),
        Evaluation::Created(alert, _placeholder_events) => {
            // `alert.id` is a placeholder (the real id is assigned on
            // insert); rebuild the event afterwards instead of trusting
            // the one `evaluate` returned.
            let placeholder_id = alert.id;
            let inserted = store.insert_alert(alert).await?;

            for issue in active_issues.iter_mut() {
                if issue.alert_id.is_none() || issue.alert_id == Some(placeholder_id) {
                    issue.alert_id = Some(inserted.id);
                }
                store.save_issue(issue).await?;
            }

            let event = events::new_event(events::ALERT_CREATED, events::MODEL_ALERT, inserted.id, monitor_id, serde_json::json!({ "priority": inserted.priority }));
            emit_and_react(store, reactions, Some(implementation), monitor_id, event, timeouts.reaction, 1).await
        }
        Evaluation::Updated(events) => {
            let alert = existing_alert.expect("Updated implies an existing alert");
            store.save_alert(&alert).await?;
            for issue in active_issues.iter() {
                store.save_issue(issue).await?;
            }
            for event in events {
                emit_and_react(store, reactions, Some(implementation), monitor_id, event, timeouts.reaction, 1).await?;
            }
            Ok(())
        }
        Evaluation::Solved(events) => {
            let alert = existing_alert.expect("Solved implies an existing alert");
            store.save_alert(&alert).await?;
            for notification in store.notifications_for_alert(alert.id).await? {
                store.close_notification(notification.id).await?;
            }
            for event in events {
                emit_and_react(store, reactions, Some(implementation), monitor_id, event, timeouts.reaction, 1).await?;
            }
            Ok(())
        }
    }
}

/// Persist `event` (skipping dispatch if it's a duplicate `(event_type,
/// model, model_id)` key) and fan out to every reaction named in
/// `reaction_options[event_name]`, concurrently up to `concurrency`,
/// bounded by `reaction_timeout` each. Reaction failures are logged and
/// never abort siblings.
pub(crate) async fn emit_and_react(
    store: &dyn Store,
    reactions: &ReactionRegistry,
    implementation: Option<&dyn Monitor>,
    monitor_id: MonitorId,
    event: Event,
    reaction_timeout: std::time::Duration,
    concurrency: usize,
) -> SentinelaResult<()> {
    let Some(persisted) = store.append_event(event).await? else {
        return Ok(());
    };

    // A request-driven transition (alert_acknowledge and friends) has no
    // Monitor implementation handy; the Event is still persisted for
    // observers, but nothing to fan out without `reaction_options`.
    let Some(implementation) = implementation else {
        return Ok(());
    };

    let names = implementation.reaction_options().for_event(&persisted.event_type);
    if names.is_empty() {
        return Ok(());
    }

    let payload = ReactionPayload {
        event_source: persisted.model.clone(),
        event_source_id: persisted.model_id,
        event_source_monitor_id: monitor_id,
        event_name: persisted.event_type.clone(),
        event_data: persisted.payload.clone(),
        extra_payload: None,
    };

    let dispatches = names.iter().cloned().map(|name| {
        let action = reactions.resolve(&name);
        let payload = payload.clone();
        async move {
            let Some(action) = action else {
                tracing::warn!(reaction = %name, "no reaction registered with this name");
                return;
            };
            match tokio::time::timeout(reaction_timeout, action.run(&payload)).await {
                Ok(Ok(())) => {}
                Ok(Err(error)) => tracing::warn!(reaction = %name, %error, "reaction failed"),
                Err(_) => tracing::warn!(reaction = %name, "reaction timed out"),
            }
        }
    });

    stream::iter(dispatches).buffer_unordered(concurrency.max(1)).collect::<Vec<()>>().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sentinela_core::options::{AlertOptions, IssueOptions, MonitorOptions, ReactionOptions};
    use sentinela_core::priority::{Priority, PriorityLevels, Rule};
    use sentinela_store::memory::InMemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSearch {
        monitor_options: MonitorOptions,
        issue_options: IssueOptions,
        alert_options: Option<AlertOptions>,
        reaction_options: ReactionOptions,
        tuples: Vec<(String, serde_json::Value)>,
    }

    #[async_trait]
    impl Monitor for FixedSearch {
        fn monitor_options(&self) -> &MonitorOptions {
            &self.monitor_options
        }
        fn issue_options(&self) -> &IssueOptions {
            &self.issue_options
        }
        fn alert_options(&self) -> Option<&AlertOptions> {
            self.alert_options.as_ref()
        }
        fn reaction_options(&self) -> &ReactionOptions {
            &self.reaction_options
        }
        async fn search(&self, _ctx: &MonitorContext) -> SentinelaResult<Vec<(String, serde_json::Value)>> {
            Ok(self.tuples.clone())
        }
    }

    fn monitor_options() -> MonitorOptions {
        MonitorOptions {
            search_cron: None,
            update_cron: None,
            time_zone: "UTC".to_string(),
        }
    }

    struct CountingReaction(Arc<AtomicUsize>);

    #[async_trait]
    impl sentinela_reactions::ReactionAction for CountingReaction {
        async fn run(&self, _payload: &ReactionPayload) -> SentinelaResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn search_creates_issues_and_triggers_alert() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let monitor = store.create_monitor("m1").await.unwrap();

        let counter = Arc::new(AtomicUsize::new(0));
        let mut reactions = ReactionRegistry::new();
        reactions.register("notify", Arc::new(CountingReaction(counter.clone())));

        let mut reaction_options = ReactionOptions::default();
        reaction_options.reactions.insert(events::ISSUE_CREATED.to_string(), vec!["notify".to_string()]);
        reaction_options.reactions.insert(events::ALERT_CREATED.to_string(), vec!["notify".to_string()]);

        let implementation: Arc<dyn Monitor> = Arc::new(FixedSearch {
            monitor_options: monitor_options(),
            issue_options: IssueOptions::default(),
            alert_options: Some(AlertOptions {
                rule: Rule::Count {
                    levels: PriorityLevels {
                        informational: Some(1),
                        low: None,
                        moderate: None,
                        high: None,
                        critical: None,
                    },
                },
            }),
            reaction_options,
            tuples: vec![("a".to_string(), json!({})), ("b".to_string(), json!({}))],
        });

        let registry = Arc::new(MonitorRegistry::new());
        registry.register(monitor.id, "m1", implementation);
        let reactions = Arc::new(reactions);

        let task_manager = TaskManager::new();
        let timeouts = ExecutionTimeouts {
            monitor: std::time::Duration::from_secs(5),
            reaction: std::time::Duration::from_secs(5),
            request: std::time::Duration::from_secs(5),
            monitor_heartbeat: std::time::Duration::from_secs(30),
        };

        process_monitor(store.clone(), registry, reactions, &task_manager, monitor.id, &[MonitorTask::Search], &timeouts, 1000, 4)
            .await
            .unwrap();

        let issues = store.active_issues(monitor.id).await.unwrap();
        assert_eq!(issues.len(), 2);
        let alert = store.active_alert(monitor.id).await.unwrap().unwrap();
        assert_eq!(alert.priority, Some(Priority::Informational));
        assert!(issues.iter().all(|i| i.alert_id == Some(alert.id)));

        // issue_created x2 + alert_created x1
        assert_eq!(counter.load(Ordering::SeqCst), 3);

        let reloaded_monitor = store.get_monitor(monitor.id).await.unwrap().unwrap();
        assert!(!reloaded_monitor.running);
        assert!(!reloaded_monitor.queued);
        assert!(reloaded_monitor.search_executed_at.is_some());
    }

    #[tokio::test]
    async fn already_running_monitor_drops_message_without_reprocessing() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let mut monitor = store.create_monitor("m1").await.unwrap();
        monitor.mark_running(Utc::now());
        store.save_monitor(&monitor).await.unwrap();

        let implementation: Arc<dyn Monitor> = Arc::new(FixedSearch {
            monitor_options: monitor_options(),
            issue_options: IssueOptions::default(),
            alert_options: None,
            reaction_options: ReactionOptions::default(),
            tuples: vec![("a".to_string(), json!({}))],
        });
        let registry = Arc::new(MonitorRegistry::new());
        registry.register(monitor.id, "m1", implementation);

        let task_manager = TaskManager::new();
        let timeouts = ExecutionTimeouts {
            monitor: std::time::Duration::from_secs(5),
            reaction: std::time::Duration::from_secs(5),
            request: std::time::Duration::from_secs(5),
            monitor_heartbeat: std::time::Duration::from_secs(30),
        };

        process_monitor(store.clone(), registry, Arc::new(ReactionRegistry::new()), &task_manager, monitor.id, &[MonitorTask::Search], &timeouts, 1000, 4)
            .await
            .unwrap();

        assert!(store.active_issues(monitor.id).await.unwrap().is_empty());
    }
}
