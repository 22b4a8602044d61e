//! Cooperative-scheduler latency monitor, grounded on
//! `components/heartbeat/heartbeat.py`: a 10-slot ring buffer of wake-up
//! timestamps, the mean pairwise latency published as a gauge, and a
//! 10-second rate-limited warning when the mean exceeds `heartbeat_time *
//! 1.05`.

use prometheus_client::metrics::gauge::Gauge;
use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

const RING_SIZE: usize = 10;
const WARNING_RATE_LIMIT: Duration = Duration::from_secs(10);
const DELAY_FACTOR: f64 = 1.05;

/// Runs until `shutdown` resolves, sleeping `heartbeat_time` between wake-ups
/// and warning when blocking work has been starving the scheduler.
pub async fn run(heartbeat_time: Duration, gauge: Gauge<f64, std::sync::atomic::AtomicU64>, shutdown: impl Future<Output = ()>) {
    let mut timestamps: VecDeque<Instant> = VecDeque::with_capacity(RING_SIZE);
    let mut last_warning: Option<Instant> = None;

    tokio::pin!(shutdown);

    loop {
        let now = Instant::now();
        timestamps.push_back(now);
        if timestamps.len() > RING_SIZE {
            timestamps.pop_front();
        }

        if let Some(mean) = mean_latency(&timestamps) {
            gauge.set(mean);
            let threshold = heartbeat_time.as_secs_f64() * DELAY_FACTOR;
            let delayed = mean > threshold;
            let can_warn = last_warning.map(|t| now.duration_since(t) > WARNING_RATE_LIMIT).unwrap_or(true);

            if delayed && can_warn {
                tracing::warn!(
                    mean_interval_secs = mean,
                    "high average heartbeat interval: blocking operations are preventing tasks from executing"
                );
                last_warning = Some(now);
            }
        }

        tokio::select! {
            _ = &mut shutdown => break,
            _ = tokio::time::sleep(heartbeat_time) => {}
        }
    }
}

fn mean_latency(timestamps: &VecDeque<Instant>) -> Option<f64> {
    if timestamps.len() < 2 {
        return None;
    }
    let mut total = 0.0;
    let mut count = 0;
    for pair in timestamps.iter().collect::<Vec<_>>().windows(2) {
        total += pair[1].duration_since(*pair[0]).as_secs_f64();
        count += 1;
    }
    Some(total / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn blocking_sleep_triggers_one_warning_within_window() {
        tracing_subscriber::fmt().with_test_writer().try_init().ok();
        let gauge: Gauge<f64, AtomicU64> = Gauge::default();
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(run(Duration::from_millis(50), gauge.clone(), async {
            let _ = rx.await;
        }));

        // Simulate a blocking call starving the scheduler.
        std::thread::sleep(Duration::from_millis(100));
        tokio::time::sleep(Duration::from_millis(120)).await;

        let _ = tx.send(());
        let _ = handle.await;

        assert!(gauge.get() > 0.0);
    }

    #[test]
    fn mean_latency_none_below_two_samples() {
        let mut ring = VecDeque::new();
        ring.push_back(Instant::now());
        assert!(mean_latency(&ring).is_none());
    }
}
