//! Bounded-concurrency task pool with parent/child cancellation, grounded on
//! `components/task_manager/task_manager.py`: `tokio::spawn` stands in for
//! `asyncio.create_task`, `JoinHandle::abort` stands in for `Task.cancel()`.
//!
//! Every task is wrapped in an isolator (mirroring `protected_task`): panics
//! and returned errors are logged and never propagate to siblings.

use sentinela_core::SentinelaResult;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub type TaskId = Uuid;

const TASKS_FINISH_CHECK_TIME: Duration = Duration::from_secs(1);
const PURGE_INTERVAL: Duration = Duration::from_secs(60);

struct ChildEntry {
    id: TaskId,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    children: HashMap<Option<TaskId>, Vec<ChildEntry>>,
    /// Parents whose cancellation hook already ran. A child registered
    /// after its parent completed (the spawn raced the registration) is
    /// caught here instead of leaking forever.
    completed_parents: std::collections::HashSet<TaskId>,
}

/// Owns the mapping from optional parent task to its list of children. Name
/// it, clone the `Arc`, pass it to every role that needs to spawn
/// cancellation-aware background work.
///
/// Registration is synchronous (a plain `Mutex`, never held across an
/// await) so a task is always recorded as a child *before* its spawned
/// future can possibly run and complete — otherwise a parent that finishes
/// immediately could race the cancellation hook against the child's own
/// registration.
#[derive(Clone)]
pub struct TaskManager {
    registry: Arc<Mutex<Registry>>,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskManager {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry::default())),
        }
    }

    /// Schedule `fut` in the background under an optional `parent`. If
    /// `parent` later completes while this task is still running, it is
    /// canceled. Errors returned by `fut` are logged, never propagated.
    pub fn create_task<F>(&self, name: &str, parent: Option<TaskId>, fut: F) -> TaskId
    where
        F: Future<Output = SentinelaResult<()>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        let registry = self.registry.clone();
        let task_name = name.to_string();

        let handle = tokio::spawn(async move {
            let outcome = fut.await;
            if let Err(error) = outcome {
                tracing::warn!(task = %task_name, %error, "task finished with an error");
            }
            Self::cancel_children(&registry, id);
        });

        {
            let mut guard = self.registry.lock().unwrap();
            let parent_already_done = parent.is_some_and(|p| guard.completed_parents.contains(&p));
            if parent_already_done {
                tracing::error!(task = %id, "cancelling task as parent task is done");
                handle.abort();
            } else {
                guard.children.entry(parent).or_default().push(ChildEntry { id, handle });
            }
        }

        id
    }

    fn cancel_children(registry: &Arc<Mutex<Registry>>, parent: TaskId) {
        let mut guard = registry.lock().unwrap();
        guard.completed_parents.insert(parent);
        if let Some(children) = guard.children.remove(&Some(parent)) {
            for child in children {
                if !child.handle.is_finished() {
                    tracing::error!(task = %child.id, "cancelling task as parent task is done");
                    child.handle.abort();
                }
            }
        }
    }

    /// Await all children of `parent`. Returns `true` if they all finished
    /// before `timeout` (or immediately if `timeout` is `None`), `false` on
    /// timeout. When `cancel` is set, pending children are aborted on
    /// timeout.
    pub async fn wait_for_tasks(&self, parent: Option<TaskId>, timeout: Option<Duration>, cancel: bool) -> bool {
        let children = {
            let mut guard = self.registry.lock().unwrap();
            guard.children.remove(&parent).unwrap_or_default()
        };

        if children.is_empty() {
            return true;
        }

        let wait_all = async {
            for child in &children {
                while !child.handle.is_finished() {
                    tokio::time::sleep(Duration::from_millis(20)).await;
                }
            }
        };

        let finished = match timeout {
            Some(t) => tokio::time::timeout(t, wait_all).await.is_ok(),
            None => {
                wait_all.await;
                true
            }
        };

        if !finished {
            if cancel {
                for child in &children {
                    if !child.handle.is_finished() {
                        tracing::info!(task = %child.id, "task timed out");
                        child.handle.abort();
                    }
                }
            }
            return false;
        }

        true
    }

    fn count_running(registry: &Registry) -> usize {
        registry
            .children
            .values()
            .flat_map(|v| v.iter())
            .filter(|c| !c.handle.is_finished())
            .count()
    }

    fn purge_completed(&self) {
        let mut guard = self.registry.lock().unwrap();
        for children in guard.children.values_mut() {
            children.retain(|c| !c.handle.is_finished());
        }
        guard.children.retain(|_, v| !v.is_empty());
    }

    /// Long-lived: periodically purge completed tasks. Returns once
    /// `shutdown` is signaled via the provided future, then waits for every
    /// remaining task across every parent bucket to finish.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tracing::info!("task manager running");
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(PURGE_INTERVAL) => {
                    self.purge_completed();
                }
            }
        }

        tracing::info!("finishing");
        loop {
            let running = {
                let guard = self.registry.lock().unwrap();
                Self::count_running(&guard)
            };
            if running == 0 {
                break;
            }
            tracing::info!(running, "waiting for tasks to finish");
            tokio::time::sleep(TASKS_FINISH_CHECK_TIME).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    #[tokio::test]
    async fn create_task_runs_and_is_purged() {
        let manager = TaskManager::new();
        let done = Arc::new(AtomicBool::new(false));
        let done2 = done.clone();
        manager.create_task("t", None, async move {
            done2.store(true, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(done.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn wait_for_tasks_returns_true_when_all_finish() {
        let manager = TaskManager::new();
        let parent = Uuid::new_v4();
        manager.create_task("child", Some(parent), async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            Ok(())
        });
        let finished = manager.wait_for_tasks(Some(parent), Some(Duration::from_secs(1)), false).await;
        assert!(finished);
    }

    #[tokio::test]
    async fn wait_for_tasks_times_out_and_cancels() {
        let manager = TaskManager::new();
        let parent = Uuid::new_v4();
        manager.create_task("child", Some(parent), async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        });
        let finished = manager.wait_for_tasks(Some(parent), Some(Duration::from_millis(50)), true).await;
        assert!(!finished);
    }

    #[tokio::test]
    async fn parent_completion_cancels_children() {
        let manager = TaskManager::new();
        let child_ran_long = Arc::new(AtomicBool::new(false));
        let marker = child_ran_long.clone();

        let parent_id = manager.create_task("parent", None, async { Ok(()) });
        manager.create_task("child", Some(parent_id), async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            marker.store(true, Ordering::SeqCst);
            Ok(())
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!child_ran_long.load(Ordering::SeqCst));
    }
}
