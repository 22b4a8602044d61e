//! `MonitorContext` — threaded explicitly into every `search`/`update`/
//! `is_solved` invocation, per the Design Note "Per-monitor runtime
//! variables" in `spec.md` §9: the source deduces the caller's monitor from
//! stack introspection (`utils/stack.py`); here it's an explicit parameter
//! instead.

use sentinela_core::models::MonitorId;
use sentinela_core::SentinelaResult;
use sentinela_store::Store;
use std::sync::Arc;

pub struct MonitorContext {
    pub monitor_id: MonitorId,
    store: Arc<dyn Store>,
}

impl MonitorContext {
    pub fn new(monitor_id: MonitorId, store: Arc<dyn Store>) -> Self {
        Self { monitor_id, store }
    }

    pub async fn get_variable(&self, name: &str) -> SentinelaResult<Option<String>> {
        Ok(self
            .store
            .get_variable(self.monitor_id, name)
            .await?
            .map(|v| v.value))
    }

    pub async fn set_variable(&self, name: &str, value: &str) -> SentinelaResult<()> {
        self.store.set_variable(self.monitor_id, name, value).await
    }
}
