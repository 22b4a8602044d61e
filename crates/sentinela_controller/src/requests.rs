//! Action-request translation (`spec.md` §4.3, §8), ported from
//! `commands/requests.py`. These are the operations the HTTP surface and
//! the Slack reaction call directly: monitor enable/disable and code
//! validation/registration run synchronously against the Store; the four
//! Alert/Issue actions are asynchronous by design (`spec.md` §8) and are
//! only ever enqueued as a `request` message for the Executor to apply.

use sentinela_core::errors::SentinelaError;
use sentinela_core::SentinelaResult;
use sentinela_monitor::validation::MonitorValidationError;
use sentinela_monitor::RegisterError;
use sentinela_queue::{
    Queue, RequestPayload, ACTION_ALERT_ACKNOWLEDGE, ACTION_ALERT_LOCK, ACTION_ALERT_SOLVE, ACTION_ISSUE_DROP,
    MESSAGE_TYPE_REQUEST,
};
use sentinela_store::Store;
use std::collections::BTreeMap;

/// Validate monitor code without registering it.
pub fn monitor_code_validate(code: &str) -> Result<(), MonitorValidationError> {
    sentinela_monitor::check_monitor(code)
}

/// Register (create-or-update) a monitor's code.
pub async fn monitor_register(
    store: &dyn Store,
    monitor_name: &str,
    code: &str,
    additional_files: BTreeMap<String, String>,
) -> Result<sentinela_core::models::Monitor, RegisterError> {
    sentinela_monitor::register_monitor(store, monitor_name, code, additional_files).await
}

pub async fn disable_monitor(store: &dyn Store, monitor_name: &str) -> SentinelaResult<String> {
    let mut monitor = store
        .get_monitor_by_name(monitor_name)
        .await?
        .ok_or_else(|| SentinelaError::not_found(format!("monitor '{monitor_name}' not found")))?;

    monitor.enabled = false;
    store.save_monitor(&monitor).await?;
    Ok(format!("{monitor_name} disabled"))
}

pub async fn enable_monitor(store: &dyn Store, monitor_name: &str) -> SentinelaResult<String> {
    let mut monitor = store
        .get_monitor_by_name(monitor_name)
        .await?
        .ok_or_else(|| SentinelaError::not_found(format!("monitor '{monitor_name}' not found")))?;

    monitor.enabled = true;
    store.save_monitor(&monitor).await?;
    Ok(format!("{monitor_name} enabled"))
}

async fn enqueue_target_action(queue: &dyn Queue, action: &str, target_id: i64) -> SentinelaResult<()> {
    queue
        .send_message(
            MESSAGE_TYPE_REQUEST,
            serde_json::to_value(RequestPayload {
                action: action.to_string(),
                params: serde_json::json!({ "target_id": target_id }),
            })?,
        )
        .await
}

pub async fn alert_acknowledge(queue: &dyn Queue, alert_id: i64) -> SentinelaResult<()> {
    enqueue_target_action(queue, ACTION_ALERT_ACKNOWLEDGE, alert_id).await
}

pub async fn alert_lock(queue: &dyn Queue, alert_id: i64) -> SentinelaResult<()> {
    enqueue_target_action(queue, ACTION_ALERT_LOCK, alert_id).await
}

pub async fn alert_solve(queue: &dyn Queue, alert_id: i64) -> SentinelaResult<()> {
    enqueue_target_action(queue, ACTION_ALERT_SOLVE, alert_id).await
}

pub async fn issue_drop(queue: &dyn Queue, issue_id: i64) -> SentinelaResult<()> {
    enqueue_target_action(queue, ACTION_ISSUE_DROP, issue_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinela_queue::internal::InternalQueue;
    use sentinela_store::memory::InMemoryStore;
    use std::time::Duration;

    #[tokio::test]
    async fn disable_then_enable_monitor_round_trips() {
        let store = InMemoryStore::new();
        store.create_monitor("m1").await.unwrap();

        let message = disable_monitor(&store, "m1").await.unwrap();
        assert_eq!(message, "m1 disabled");
        assert!(!store.get_monitor_by_name("m1").await.unwrap().unwrap().enabled);

        let message = enable_monitor(&store, "m1").await.unwrap();
        assert_eq!(message, "m1 enabled");
        assert!(store.get_monitor_by_name("m1").await.unwrap().unwrap().enabled);
    }

    #[tokio::test]
    async fn disable_unknown_monitor_is_not_found() {
        let store = InMemoryStore::new();
        let error = disable_monitor(&store, "ghost").await.unwrap_err();
        assert_eq!(error.kind, sentinela_core::ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn alert_solve_enqueues_a_request_message() {
        let queue = InternalQueue::new(Duration::from_millis(200));
        alert_solve(&queue, 42).await.unwrap();

        let message = queue.get_message().await.unwrap().unwrap();
        assert_eq!(message.content.message_type, MESSAGE_TYPE_REQUEST);
        let payload: RequestPayload = serde_json::from_value(message.content.payload).unwrap();
        assert_eq!(payload.action, ACTION_ALERT_SOLVE);
        assert_eq!(payload.params["target_id"], 42);
    }
}
