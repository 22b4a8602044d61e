//! The Queue abstraction (`spec.md` §4.5): durable messages with
//! visibility-timeout semantics; internal or external (SQS-like). Backends
//! must provide visibility-timeout re-delivery; durable ordering and FIFO
//! are not required.

pub mod internal;
#[cfg(feature = "sqs-queue")]
pub mod sqs_sketch;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `{ "type": <string>, "payload": <object> }` — the one wire schema every
/// backend speaks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Value,
}

/// A dequeued message handle. `id` and `receipt` are backend-specific;
/// `content` parses the envelope eagerly so handlers never see raw JSON.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: String,
    pub receipt: String,
    pub content: RawMessage,
}

#[async_trait]
pub trait Queue: Send + Sync {
    /// Idempotent bring-up.
    async fn init(&self) -> sentinela_core::SentinelaResult<()>;

    async fn send_message(&self, message_type: &str, payload: Value) -> sentinela_core::SentinelaResult<()>;

    /// Long-poll up to `queue_wait_message_time`.
    async fn get_message(&self) -> sentinela_core::SentinelaResult<Option<Message>>;

    /// Extend the invisibility window; no-ops are legal for backends
    /// without real visibility tracking.
    async fn change_visibility(&self, message: &Message) -> sentinela_core::SentinelaResult<()>;

    /// Permanent removal.
    async fn delete_message(&self, message: &Message) -> sentinela_core::SentinelaResult<()>;

    fn queue_wait_message_time(&self) -> std::time::Duration;
}

/// `process_monitor` payload: `{ "monitor_id": int, "tasks": [...] }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessMonitorPayload {
    pub monitor_id: i64,
    pub tasks: Vec<MonitorTask>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MonitorTask {
    Search,
    Update,
}

/// `request` payload: `{ "action": string, "params": { "target_id": int, ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestPayload {
    pub action: String,
    pub params: Value,
}

pub const MESSAGE_TYPE_PROCESS_MONITOR: &str = "process_monitor";
pub const MESSAGE_TYPE_REQUEST: &str = "request";

/// `RequestPayload.action` values the Executor knows how to apply
/// (`spec.md` §4.2.2). Plugin actions use the `plugin.<name>.<action>`
/// shape instead and aren't enumerated here.
pub const ACTION_ALERT_ACKNOWLEDGE: &str = "alert_acknowledge";
pub const ACTION_ALERT_LOCK: &str = "alert_lock";
pub const ACTION_ALERT_SOLVE: &str = "alert_solve";
pub const ACTION_ISSUE_DROP: &str = "issue_drop";
