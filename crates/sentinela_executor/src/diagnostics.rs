//! Executor health reporting for `GET /status` (`spec.md` §4.1, §4.4),
//! mirrored on the Controller's own `sentinela_controller::diagnostics`:
//! whether a worker has polled the Queue within its own long-poll window
//! plus a grace period.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    Degraded,
}

#[derive(Debug, Clone)]
pub struct Diagnostics {
    pub status: Status,
    pub issues: Vec<String>,
}

/// `last_poll_millis` is `Executor::last_poll_millis()`; a worker that
/// hasn't polled within `queue_wait_message_time + grace` is either stuck
/// or the role was never started.
pub fn executor_diagnostics(last_poll_millis: i64, now: DateTime<Utc>, tolerance: chrono::Duration) -> Diagnostics {
    let last_poll = DateTime::from_timestamp_millis(last_poll_millis).unwrap_or(now);
    let mut issues = Vec::new();

    if now - last_poll > tolerance {
        issues.push("executor workers have not polled the queue within tolerance".to_string());
    }

    let status = if issues.is_empty() { Status::Ok } else { Status::Degraded };
    Diagnostics { status, issues }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn ok_when_recently_polled() {
        let now = Utc::now();
        let diagnostics = executor_diagnostics(now.timestamp_millis(), now, Duration::seconds(5));
        assert_eq!(diagnostics.status, Status::Ok);
    }

    #[test]
    fn degraded_when_stale() {
        let now = Utc::now();
        let stale = (now - Duration::minutes(10)).timestamp_millis();
        let diagnostics = executor_diagnostics(stale, now, Duration::seconds(5));
        assert_eq!(diagnostics.status, Status::Degraded);
        assert_eq!(diagnostics.issues.len(), 1);
    }
}
