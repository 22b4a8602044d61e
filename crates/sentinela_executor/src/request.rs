//! Request-action application (`spec.md` §4.2.2), ported from
//! `commands/requests.py`'s consumer side: the four synchronous Alert/Issue
//! transitions, plus `plugin.<name>.<action>` dispatch. Every path here is
//! idempotent — repeated delivery of the same action must not change state
//! further, since the Queue only promises at-least-once delivery.

use sentinela_core::alert_machine;
use sentinela_core::errors::SentinelaError;
use sentinela_core::events;
use sentinela_core::issue_machine;
use sentinela_core::models::MonitorId;
use sentinela_core::SentinelaResult;
use sentinela_monitor::MonitorRegistry;
use sentinela_queue::{RequestPayload, ACTION_ALERT_ACKNOWLEDGE, ACTION_ALERT_LOCK, ACTION_ALERT_SOLVE, ACTION_ISSUE_DROP};
use sentinela_reactions::{PluginActionRegistry, ReactionRegistry};
use sentinela_store::Store;

use crate::process_monitor::emit_and_react;

const PLUGIN_ACTION_PREFIX: &str = "plugin.";

fn target_id(params: &serde_json::Value) -> SentinelaResult<i64> {
    params
        .get("target_id")
        .and_then(|v| v.as_i64())
        .ok_or_else(|| SentinelaError::validation("request payload missing integer 'target_id'"))
}

/// Applies one `RequestPayload`. Returns `Ok` for everything the Queue
/// contract treats as "delete the message" (unknown action, missing
/// target, already-applied action) and logs along the way; only a
/// Store/infrastructure error escapes as `Err`.
#[allow(clippy::too_many_arguments)]
pub async fn apply_request(
    store: &dyn Store,
    registry: &MonitorRegistry,
    reactions: &ReactionRegistry,
    plugins: &PluginActionRegistry,
    payload: &RequestPayload,
    reaction_timeout: std::time::Duration,
) -> SentinelaResult<()> {
    if payload.action.starts_with(PLUGIN_ACTION_PREFIX) {
        return apply_plugin_action(plugins, &payload.action, &payload.params).await;
    }

    match payload.action.as_str() {
        ACTION_ALERT_ACKNOWLEDGE => alert_acknowledge(store, registry, reactions, target_id(&payload.params)?, reaction_timeout).await,
        ACTION_ALERT_LOCK => alert_lock(store, registry, reactions, target_id(&payload.params)?, reaction_timeout).await,
        ACTION_ALERT_SOLVE => alert_solve(store, registry, reactions, target_id(&payload.params)?, reaction_timeout).await,
        ACTION_ISSUE_DROP => issue_drop(store, registry, reactions, target_id(&payload.params)?, reaction_timeout).await,
        other => {
            tracing::warn!(action = %other, "no handler registered for this request action");
            Ok(())
        }
    }
}

async fn apply_plugin_action(plugins: &PluginActionRegistry, name: &str, params: &serde_json::Value) -> SentinelaResult<()> {
    let Some(action) = plugins.resolve(name) else {
        tracing::warn!(action = %name, "no plugin registered with this name");
        return Ok(());
    };
    if let Err(error) = action.invoke(params).await {
        tracing::warn!(action = %name, %error, "plugin action failed");
    }
    Ok(())
}

fn resolve(registry: &MonitorRegistry, monitor_id: MonitorId) -> Option<std::sync::Arc<dyn sentinela_monitor::Monitor>> {
    registry.resolve(monitor_id)
}

async fn alert_acknowledge(store: &dyn Store, registry: &MonitorRegistry, reactions: &ReactionRegistry, alert_id: i64, reaction_timeout: std::time::Duration) -> SentinelaResult<()> {
    let Some(mut alert) = store.get_alert(alert_id).await? else {
        tracing::warn!(alert_id, "alert_acknowledge: alert not found");
        return Ok(());
    };

    let Some(event) = alert_machine::acknowledge(&mut alert) else {
        return Ok(());
    };

    store.save_alert(&alert).await?;
    let implementation = resolve(registry, alert.monitor_id);
    emit_and_react(store, reactions, implementation.as_deref(), alert.monitor_id, event, reaction_timeout, 1).await
}

async fn alert_lock(store: &dyn Store, registry: &MonitorRegistry, reactions: &ReactionRegistry, alert_id: i64, reaction_timeout: std::time::Duration) -> SentinelaResult<()> {
    let Some(mut alert) = store.get_alert(alert_id).await? else {
        tracing::warn!(alert_id, "alert_lock: alert not found");
        return Ok(());
    };

    let Some(event) = alert_machine::lock(&mut alert) else {
        return Ok(());
    };

    store.save_alert(&alert).await?;
    let implementation = resolve(registry, alert.monitor_id);
    emit_and_react(store, reactions, implementation.as_deref(), alert.monitor_id, event, reaction_timeout, 1).await
}

async fn alert_solve(store: &dyn Store, registry: &MonitorRegistry, reactions: &ReactionRegistry, alert_id: i64, reaction_timeout: std::time::Duration) -> SentinelaResult<()> {
    let Some(mut alert) = store.get_alert(alert_id).await? else {
        tracing::warn!(alert_id, "alert_solve: alert not found");
        return Ok(());
    };

    let mut linked_active = store
        .active_issues(alert.monitor_id)
        .await?
        .into_iter()
        .filter(|issue| issue.alert_id == Some(alert_id))
        .collect::<Vec<_>>();
    let mut linked_active_refs: Vec<&mut _> = linked_active.iter_mut().collect();

    let (issue_events, alert_event) = alert_machine::force_solve(&mut alert, &mut linked_active_refs, chrono::Utc::now());

    if issue_events.is_empty() && alert_event.is_none() {
        return Ok(());
    }

    for issue in &linked_active {
        store.save_issue(issue).await?;
    }
    store.save_alert(&alert).await?;

    for notification in store.notifications_for_alert(alert.id).await? {
        store.close_notification(notification.id).await?;
    }

    let implementation = resolve(registry, alert.monitor_id);
    for event in issue_events {
        emit_and_react(store, reactions, implementation.as_deref(), alert.monitor_id, event, reaction_timeout, 1).await?;
    }
    if let Some(event) = alert_event {
        emit_and_react(store, reactions, implementation.as_deref(), alert.monitor_id, event, reaction_timeout, 1).await?;
    }
    Ok(())
}

async fn issue_drop(store: &dyn Store, registry: &MonitorRegistry, reactions: &ReactionRegistry, issue_id: i64, reaction_timeout: std::time::Duration) -> SentinelaResult<()> {
    let Some(mut issue) = store.get_issue(issue_id).await? else {
        tracing::warn!(issue_id, "issue_drop: issue not found");
        return Ok(());
    };

    let Some(event) = issue_machine::drop_issue(&mut issue, chrono::Utc::now()) else {
        return Ok(());
    };

    store.save_issue(&issue).await?;
    let implementation = resolve(registry, issue.monitor_id);
    emit_and_react(store, reactions, implementation.as_deref(), issue.monitor_id, event, reaction_timeout, 1).await?;

    // Dropping an Issue can cascade into solving its Alert (§4.2.2:
    // "re-evaluate its Alert"), but only if it was actually linked to one.
    let Some(alert_id) = issue.alert_id else {
        return Ok(());
    };
    let Some(mut alert) = store.get_alert(alert_id).await? else {
        return Ok(());
    };
    if !alert.is_active() {
        return Ok(());
    }

    let still_active = store
        .active_issues(issue.monitor_id)
        .await?
        .into_iter()
        .any(|i| i.alert_id == Some(alert_id));

    if still_active {
        return Ok(());
    }

    alert.status = sentinela_core::models::AlertStatus::Solved;
    alert.solved_at = Some(chrono::Utc::now());
    store.save_alert(&alert).await?;

    for notification in store.notifications_for_alert(alert.id).await? {
        store.close_notification(notification.id).await?;
    }

    let solved_event = events::new_event(events::ALERT_SOLVED, events::MODEL_ALERT, alert.id, alert.monitor_id, serde_json::json!({}));
    let implementation = resolve(registry, alert.monitor_id);
    emit_and_react(store, reactions, implementation.as_deref(), alert.monitor_id, solved_event, reaction_timeout, 1).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinela_core::models::AlertStatus;
    use sentinela_core::priority::Priority;
    use sentinela_monitor::MonitorRegistry;
    use sentinela_reactions::ReactionRegistry;
    use sentinela_store::memory::InMemoryStore;

    async fn alert_with_issue(store: &InMemoryStore) -> (i64, i64) {
        let monitor = store.create_monitor("m1").await.unwrap();
        let (issue, _) = issue_machine::create(0, monitor.id, "a", serde_json::json!({}), chrono::Utc::now());
        let issue = store.insert_issue(issue).await.unwrap();

        let alert = sentinela_core::models::Alert::new(0, monitor.id, Some(Priority::High), chrono::Utc::now());
        let alert = store.insert_alert(alert).await.unwrap();

        let mut issue = issue;
        issue.alert_id = Some(alert.id);
        store.save_issue(&issue).await.unwrap();

        (alert.id, issue.id)
    }

    #[tokio::test]
    async fn acknowledge_is_idempotent() {
        let store = InMemoryStore::new();
        let (alert_id, _) = alert_with_issue(&store).await;
        let payload = RequestPayload {
            action: ACTION_ALERT_ACKNOWLEDGE.to_string(),
            params: serde_json::json!({ "target_id": alert_id }),
        };
        let plugins = PluginActionRegistry::new();

        apply_request(&store, &MonitorRegistry::new(), &ReactionRegistry::new(), &plugins, &payload, std::time::Duration::from_secs(5)).await.unwrap();
        apply_request(&store, &MonitorRegistry::new(), &ReactionRegistry::new(), &plugins, &payload, std::time::Duration::from_secs(5)).await.unwrap();

        let alert = store.get_alert(alert_id).await.unwrap().unwrap();
        assert!(alert.acknowledged);
    }

    #[tokio::test]
    async fn alert_solve_drops_linked_issues() {
        let store = InMemoryStore::new();
        let (alert_id, issue_id) = alert_with_issue(&store).await;
        let payload = RequestPayload {
            action: ACTION_ALERT_SOLVE.to_string(),
            params: serde_json::json!({ "target_id": alert_id }),
        };
        let plugins = PluginActionRegistry::new();

        apply_request(&store, &MonitorRegistry::new(), &ReactionRegistry::new(), &plugins, &payload, std::time::Duration::from_secs(5)).await.unwrap();

        let alert = store.get_alert(alert_id).await.unwrap().unwrap();
        assert_eq!(alert.status, AlertStatus::Solved);
        let issue = store.get_issue(issue_id).await.unwrap().unwrap();
        assert!(!issue.is_active());
    }

    #[tokio::test]
    async fn issue_drop_cascades_to_solved_alert() {
        let store = InMemoryStore::new();
        let (alert_id, issue_id) = alert_with_issue(&store).await;
        let payload = RequestPayload {
            action: ACTION_ISSUE_DROP.to_string(),
            params: serde_json::json!({ "target_id": issue_id }),
        };
        let plugins = PluginActionRegistry::new();

        apply_request(&store, &MonitorRegistry::new(), &ReactionRegistry::new(), &plugins, &payload, std::time::Duration::from_secs(5)).await.unwrap();

        let alert = store.get_alert(alert_id).await.unwrap().unwrap();
        assert_eq!(alert.status, AlertStatus::Solved);
    }

    #[tokio::test]
    async fn unknown_action_is_skipped_without_error() {
        let store = InMemoryStore::new();
        let payload = RequestPayload {
            action: "not_a_real_action".to_string(),
            params: serde_json::json!({}),
        };
        let plugins = PluginActionRegistry::new();
        apply_request(&store, &MonitorRegistry::new(), &ReactionRegistry::new(), &plugins, &payload, std::time::Duration::from_secs(5)).await.unwrap();
    }
}
