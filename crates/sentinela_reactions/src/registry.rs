//! `ReactionAction` — one user-declared callable invoked in response to an
//! Event, plus the name -> callable registry the core dispatches against.
//! Named reactions only: the core never holds the callables directly (same
//! "Module-level singletons" treatment as `sentinela_monitor::MonitorRegistry`).

use async_trait::async_trait;
use sentinela_core::options::ReactionPayload;
use sentinela_core::SentinelaResult;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ReactionAction: Send + Sync {
    async fn run(&self, payload: &ReactionPayload) -> SentinelaResult<()>;
}

#[derive(Default)]
pub struct ReactionRegistry {
    reactions: HashMap<String, Arc<dyn ReactionAction>>,
}

impl ReactionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, action: Arc<dyn ReactionAction>) {
        self.reactions.insert(name.into(), action);
    }

    pub fn resolve(&self, name: &str) -> Option<Arc<dyn ReactionAction>> {
        self.reactions.get(name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl ReactionAction for Counting {
        async fn run(&self, _payload: &ReactionPayload) -> SentinelaResult<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn resolve_dispatches_to_registered_reaction() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut registry = ReactionRegistry::new();
        registry.register("count", Arc::new(Counting(counter.clone())));

        let payload = ReactionPayload {
            event_source: "Issue".into(),
            event_source_id: 1,
            event_source_monitor_id: 1,
            event_name: "issue_created".into(),
            event_data: serde_json::json!({}),
            extra_payload: None,
        };

        let action = registry.resolve("count").unwrap();
        action.run(&payload).await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(registry.resolve("missing").is_none());
    }
}
