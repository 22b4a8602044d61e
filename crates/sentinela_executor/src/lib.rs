//! The Executor role (`spec.md` §4.2): a bounded pool of workers draining
//! the Queue, dispatching `process_monitor` messages to
//! [`process_monitor::process_monitor`] and `request` messages to
//! [`request::apply_request`].

pub mod diagnostics;
pub mod process_monitor;
pub mod request;

pub use diagnostics::{executor_diagnostics, Diagnostics, Status};
pub use process_monitor::process_monitor;
pub use request::apply_request;

use chrono::Utc;
use sentinela_core::options::ExecutionTimeouts;
use sentinela_core::SentinelaResult;
use sentinela_monitor::MonitorRegistry;
use sentinela_queue::{Message, ProcessMonitorPayload, Queue, RequestPayload, MESSAGE_TYPE_PROCESS_MONITOR, MESSAGE_TYPE_REQUEST};
use sentinela_reactions::{PluginActionRegistry, ReactionRegistry};
use sentinela_store::Store;
use sentinela_task::TaskManager;
use std::future::Future;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Ties the Queue, Store, registries, and `TaskManager` together into the
/// `executor_concurrency`-wide worker pool `main.py`'s `executor.run()`
/// starts.
pub struct Executor {
    store: Arc<dyn Store>,
    queue: Arc<dyn Queue>,
    registry: Arc<MonitorRegistry>,
    reactions: Arc<ReactionRegistry>,
    plugins: Arc<PluginActionRegistry>,
    task_manager: TaskManager,
    timeouts: ExecutionTimeouts,
    max_issues_creation: u64,
    concurrency: usize,
    last_poll: Arc<AtomicI64>,
}

impl Executor {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        queue: Arc<dyn Queue>,
        registry: Arc<MonitorRegistry>,
        reactions: Arc<ReactionRegistry>,
        plugins: Arc<PluginActionRegistry>,
        task_manager: TaskManager,
        timeouts: ExecutionTimeouts,
        max_issues_creation: u64,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            queue,
            registry,
            reactions,
            plugins,
            task_manager,
            timeouts,
            max_issues_creation,
            concurrency,
            last_poll: Arc::new(AtomicI64::new(Utc::now().timestamp_millis())),
        }
    }

    /// Millis-since-epoch of the most recent worker poll, across every
    /// worker — the liveness signal `/status` reports against (`spec.md`
    /// §4.1 "Diagnostics", generalized to the Executor role).
    pub fn last_poll_millis(&self) -> i64 {
        self.last_poll.load(Ordering::Relaxed)
    }

    /// Runs `concurrency` workers, each long-polling `Queue.get_message`
    /// and dispatching by message type, until `shutdown` resolves. A
    /// worker mid-way through handling a message finishes that message
    /// before checking shutdown again; nothing is cancelled out from under
    /// `process_monitor`/`apply_request`.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let (shutdown_tx, _) = broadcast::channel::<()>(1);
        let worker_count = self.concurrency.max(1);
        tracing::info!(worker_count, "executor running");

        let workers = futures::future::join_all((0..worker_count).map(|id| self.worker_loop(id, shutdown_tx.subscribe())));
        tokio::pin!(workers);
        tokio::pin!(shutdown);

        tokio::select! {
            _ = &mut workers => {}
            _ = &mut shutdown => {
                let _ = shutdown_tx.send(());
                workers.await;
            }
        }

        tracing::info!("executor finished");
    }

    async fn worker_loop(&self, worker_id: usize, mut shutdown_rx: broadcast::Receiver<()>) {
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => break,
                message = self.queue.get_message() => {
                    self.last_poll.store(Utc::now().timestamp_millis(), Ordering::Relaxed);
                    match message {
                        Ok(Some(message)) => self.handle_message(message).await,
                        Ok(None) => {}
                        Err(error) => tracing::error!(worker_id, %error, "failed to receive a message"),
                    }
                }
            }
        }
    }

    async fn handle_message(&self, message: Message) {
        match self.dispatch(&message).await {
            Ok(()) => {
                if let Err(error) = self.queue.delete_message(&message).await {
                    tracing::error!(%error, "failed to delete a processed message");
                }
            }
            Err(error) => {
                tracing::error!(%error, "message processing failed unexpectedly, abandoning for redelivery");
            }
        }
    }

    async fn dispatch(&self, message: &Message) -> SentinelaResult<()> {
        match message.content.message_type.as_str() {
            MESSAGE_TYPE_PROCESS_MONITOR => {
                let payload: ProcessMonitorPayload = serde_json::from_value(message.content.payload.clone())?;
                process_monitor::process_monitor(
                    self.store.clone(),
                    self.registry.clone(),
                    self.reactions.clone(),
                    &self.task_manager,
                    payload.monitor_id,
                    &payload.tasks,
                    &self.timeouts,
                    self.max_issues_creation,
                    self.concurrency,
                )
                .await
            }
            MESSAGE_TYPE_REQUEST => {
                let payload: RequestPayload = serde_json::from_value(message.content.payload.clone())?;
                request::apply_request(
                    self.store.as_ref(),
                    self.registry.as_ref(),
                    self.reactions.as_ref(),
                    self.plugins.as_ref(),
                    &payload,
                    self.timeouts.request,
                )
                .await
            }
            other => {
                tracing::warn!(message_type = %other, "unknown message type, dropping");
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sentinela_queue::internal::InternalQueue;
    use sentinela_store::memory::InMemoryStore;
    use std::time::Duration;

    fn timeouts() -> ExecutionTimeouts {
        ExecutionTimeouts {
            monitor: Duration::from_secs(5),
            reaction: Duration::from_secs(5),
            request: Duration::from_secs(5),
            monitor_heartbeat: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn unknown_message_type_is_dropped() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InternalQueue::new(Duration::from_millis(50)));
        let executor = Executor::new(
            store,
            queue.clone(),
            Arc::new(MonitorRegistry::new()),
            Arc::new(ReactionRegistry::new()),
            Arc::new(PluginActionRegistry::new()),
            TaskManager::new(),
            timeouts(),
            1000,
            4,
        );

        queue.send_message("not_a_real_type", serde_json::json!({})).await.unwrap();
        let message = queue.get_message().await.unwrap().unwrap();
        executor.handle_message(message).await;

        assert!(queue.get_message().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn run_stops_workers_on_shutdown() {
        let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
        let queue: Arc<dyn Queue> = Arc::new(InternalQueue::new(Duration::from_millis(50)));
        let executor = Executor::new(
            store,
            queue,
            Arc::new(MonitorRegistry::new()),
            Arc::new(ReactionRegistry::new()),
            Arc::new(PluginActionRegistry::new()),
            TaskManager::new(),
            timeouts(),
            1000,
            2,
        );

        let shutdown = async {
            tokio::time::sleep(Duration::from_millis(100)).await;
        };

        tokio::time::timeout(Duration::from_secs(2), executor.run(shutdown)).await.expect("run should return once shutdown resolves");
    }
}
