//! Plugin action dispatch table, grounded on `src/plugins/plugins_loader.py`
//! / `src/plugins/services.py`: the original resolves a name of the shape
//! `plugin.<name>.<action>` to a callable at runtime. The core keeps the
//! interface only, per "Out of scope: Plugins ... the core only sees their
//! interfaces" (`spec.md` §1).

use async_trait::async_trait;
use sentinela_core::SentinelaResult;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait PluginAction: Send + Sync {
    async fn invoke(&self, params: &Value) -> SentinelaResult<()>;
}

#[derive(Default)]
pub struct PluginActionRegistry {
    actions: HashMap<String, Arc<dyn PluginAction>>,
}

impl PluginActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// `name` is the full `plugin.<name>.<action>` identifier.
    pub fn register(&mut self, name: impl Into<String>, action: Arc<dyn PluginAction>) {
        self.actions.insert(name.into(), action);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn PluginAction>> {
        self.actions.get(name).cloned()
    }
}
