//! `MonitorRegistry` — holds `Arc<dyn Monitor>` trait objects registered at
//! process start (statically-registered-plugins style), per the Design Note
//! "Module-level singletons" in `spec.md` §9. Deliberately decoupled from
//! the `CodeModule` text the Store holds: the registry answers "what runs
//! when monitor N is processed", the Store answers "what source text was
//! registered for monitor N" (used only for the HTTP round-trip and the
//! periodic update-detection procedure).

use crate::monitor::Monitor;
use sentinela_core::models::MonitorId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Default)]
pub struct MonitorRegistry {
    by_id: RwLock<HashMap<MonitorId, Arc<dyn Monitor>>>,
    by_name: RwLock<HashMap<String, MonitorId>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the live implementation for `monitor_id`.
    pub fn register(&self, monitor_id: MonitorId, name: &str, implementation: Arc<dyn Monitor>) {
        self.by_id.write().unwrap().insert(monitor_id, implementation);
        self.by_name.write().unwrap().insert(name.to_string(), monitor_id);
    }

    pub fn resolve(&self, monitor_id: MonitorId) -> Option<Arc<dyn Monitor>> {
        self.by_id.read().unwrap().get(&monitor_id).cloned()
    }

    pub fn resolve_by_name(&self, name: &str) -> Option<Arc<dyn Monitor>> {
        let id = *self.by_name.read().unwrap().get(name)?;
        self.resolve(id)
    }

    pub fn registered_ids(&self) -> Vec<MonitorId> {
        self.by_id.read().unwrap().keys().copied().collect()
    }
}
