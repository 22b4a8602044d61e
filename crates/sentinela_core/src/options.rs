//! Declarative option blocks a registered Monitor carries alongside its
//! `search`/`update`/`is_solved` code: `issue_options`, optional
//! `alert_options`, optional `reaction_options`.

use crate::priority::Rule;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

/// How often `search`/`update` are triggered, and the timezone cron is
/// evaluated in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorOptions {
    pub search_cron: Option<String>,
    pub update_cron: Option<String>,
    pub time_zone: String,
}

/// Bounds applied to issue creation for one `search` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueOptions {
    /// Per-run cap; exceeding this fails the `MonitorExecution`. Falls
    /// back to the global `max_issues_creation` config when unset.
    pub max_issues_creation: Option<u64>,
}

impl Default for IssueOptions {
    fn default() -> Self {
        Self {
            max_issues_creation: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertOptions {
    pub rule: Rule,
}

/// `reaction_options[event_name] -> [reaction names]`. Names are resolved
/// against a `ReactionRegistry` at dispatch time; the core only ever deals
/// in names, never the callables themselves (Design Note: "Module-level
/// singletons").
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReactionOptions {
    #[serde(flatten)]
    pub reactions: HashMap<String, Vec<String>>,
}

impl ReactionOptions {
    pub fn for_event(&self, event_name: &str) -> &[String] {
        self.reactions
            .get(event_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Structured payload handed to every reaction callable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionPayload {
    pub event_source: String,
    pub event_source_id: i64,
    pub event_source_monitor_id: i64,
    pub event_name: String,
    pub event_data: serde_json::Value,
    pub extra_payload: Option<serde_json::Value>,
}

/// Tunables threaded from `Configs` into the Executor, kept here so the
/// state-machine/priority code and the execution loop agree on units.
#[derive(Debug, Clone)]
pub struct ExecutionTimeouts {
    pub monitor: Duration,
    pub reaction: Duration,
    pub request: Duration,
    pub monitor_heartbeat: Duration,
}
