//! The Controller role (`spec.md` §4.1, §4.4): the trigger loop that turns
//! cron fires into `process_monitor` messages, the periodic health
//! procedures, action-request translation, and `/status` diagnostics.

pub mod diagnostics;
pub mod procedures;
pub mod requests;
pub mod trigger;

pub use diagnostics::{controller_diagnostics, Diagnostics, Status};
pub use procedures::ProceduresRunner;
pub use trigger::{tasks_for_monitor, TriggerLoop};

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;

/// Runs the trigger loop and the procedures runner on their own cron
/// cadences until `shutdown` resolves, matching `main.py`'s Controller
/// entry point: both loops poll once a second and act only when their own
/// schedule says so, rather than sleeping for a cron-computed duration.
pub struct Controller {
    pub trigger_loop: Arc<TriggerLoop>,
    pub procedures: Arc<ProceduresRunner>,
}

impl Controller {
    pub fn new(trigger_loop: Arc<TriggerLoop>, procedures: Arc<ProceduresRunner>) -> Self {
        Self { trigger_loop, procedures }
    }

    pub async fn diagnostics(&self, grace: chrono::Duration) -> Diagnostics {
        controller_diagnostics(&self.trigger_loop, &self.procedures, Utc::now(), grace).await
    }

    pub async fn run(&self, poll_interval: Duration, shutdown: impl std::future::Future<Output = ()>) {
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = tokio::time::sleep(poll_interval) => {
                    let now = Utc::now();

                    if self.trigger_loop.schedule().is_triggered(self.trigger_loop.last_run().await, now) {
                        match self.trigger_loop.tick(now).await {
                            Ok(enqueued) if enqueued > 0 => tracing::info!(enqueued, "trigger loop enqueued monitor work"),
                            Ok(_) => {}
                            Err(error) => tracing::error!(%error, "trigger loop tick failed"),
                        }
                    }

                    self.procedures.tick(now).await;
                }
            }
        }
    }
}
