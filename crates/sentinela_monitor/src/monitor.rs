//! The `Monitor` capability set a registered user job implements, per the
//! Design Note "User-supplied callables" in `spec.md` §9: the source loads
//! arbitrary source at runtime; this crate re-architects that as an
//! interface a target-language implementation (scripting subsystem, Wasm,
//! or statically registered plugin, as here) can satisfy.

use crate::context::MonitorContext;
use async_trait::async_trait;
use sentinela_core::options::{AlertOptions, IssueOptions, MonitorOptions, ReactionOptions};
use sentinela_core::SentinelaResult;
use serde_json::Value;

/// One `(model_id, data)` tuple produced by `search`.
pub type SearchResult = (String, Value);

#[async_trait]
pub trait Monitor: Send + Sync {
    fn monitor_options(&self) -> &MonitorOptions;
    fn issue_options(&self) -> &IssueOptions;
    fn alert_options(&self) -> Option<&AlertOptions>;
    fn reaction_options(&self) -> &ReactionOptions;

    /// Discover problem rows. Finite, not restartable.
    async fn search(&self, ctx: &MonitorContext) -> SentinelaResult<Vec<SearchResult>>;

    /// Re-evaluate one known Issue's data. Defaults to the identity
    /// function (no-op update), matching a monitor that only implements
    /// `search`.
    async fn update(&self, _ctx: &MonitorContext, data: Value) -> SentinelaResult<Value> {
        Ok(data)
    }

    /// Decide whether a (freshly updated) Issue is resolved. Defaults to
    /// always-false per `spec.md` §4.2.1.
    async fn is_solved(&self, _ctx: &MonitorContext, _data: &Value) -> bool {
        false
    }
}
