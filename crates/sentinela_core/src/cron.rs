//! Cron trigger evaluation.
//!
//! A cron schedule is *triggered* at reference time `t` against
//! last-execution `t_last` when the next cron instant at or after `t_last`
//! is `<= t`. A null `t_last` is always triggered. Evaluation happens in a
//! configured timezone (`chrono_tz::Tz`).

use crate::errors::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::str::FromStr;

/// The `cron` crate requires a leading seconds field (6 fields); the
/// original's `croniter`-based configs (and the standard crontab form) omit
/// it (5 fields: minute hour day-of-month month day-of-week). Prepend a
/// `"0"` seconds field so both forms are accepted the way the documented
/// configuration actually writes them.
fn normalize_to_six_fields(expr: &str) -> String {
    match expr.split_whitespace().count() {
        5 => format!("0 {expr}"),
        _ => expr.to_string(),
    }
}

#[derive(Debug, Clone)]
pub struct CronSchedule {
    expr: String,
    schedule: cron::Schedule,
    tz: Tz,
}

impl CronSchedule {
    pub fn parse(expr: &str, tz: Tz) -> Result<Self, SentinelaError> {
        let normalized = normalize_to_six_fields(expr);
        let schedule = cron::Schedule::from_str(&normalized).map_err(|e| {
            SentinelaError::new(
                ErrorKind::ConfigError,
                ErrorCategory::Configuration,
                ErrorSeverity::High,
                format!("invalid cron expression '{expr}': {e}"),
            )
        })?;
        Ok(Self {
            expr: expr.to_string(),
            schedule,
            tz,
        })
    }

    pub fn expression(&self) -> &str {
        &self.expr
    }

    /// `is_triggered(c, t_last, t)`. The next cron instant is taken
    /// strictly after `t_last`, not `t_last` itself — `t_last` is the
    /// instant the last run already consumed, so a schedule matching
    /// `t_last` exactly must wait for its *next* occurrence, not re-fire
    /// immediately (otherwise a monitor would hot-loop every controller
    /// tick instead of honoring its cadence).
    pub fn is_triggered(&self, t_last: Option<DateTime<Utc>>, t: DateTime<Utc>) -> bool {
        let Some(t_last) = t_last else {
            return true;
        };

        let t_last_tz = t_last.with_timezone(&self.tz);
        let t_tz = t.with_timezone(&self.tz);

        match self.schedule.after(&t_last_tz).next() {
            Some(next) => next <= t_tz,
            None => false,
        }
    }

    /// `time_until_next_trigger(c, t) > 0`, respecting the configured
    /// timezone.
    pub fn time_until_next_trigger(&self, t: DateTime<Utc>) -> Option<Duration> {
        let t_tz = t.with_timezone(&self.tz);
        let next = self.schedule.after(&t_tz).next()?;
        Some(next.with_timezone(&Utc) - t)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn null_last_execution_always_triggers() {
        let c = CronSchedule::parse("0 0 * * * *", chrono_tz::UTC).unwrap();
        assert!(c.is_triggered(None, utc(2026, 1, 1, 0, 0, 0)));
    }

    #[test]
    fn triggers_once_next_instant_passes() {
        // every minute on the minute
        let c = CronSchedule::parse("0 * * * * *", chrono_tz::UTC).unwrap();
        let last = utc(2026, 1, 1, 10, 0, 0);
        assert!(!c.is_triggered(Some(last), utc(2026, 1, 1, 10, 0, 30)));
        assert!(c.is_triggered(Some(last), utc(2026, 1, 1, 10, 1, 0)));
        assert!(c.is_triggered(Some(last), utc(2026, 1, 1, 10, 5, 0)));
    }

    #[test]
    fn monotonic_once_triggered_stays_triggered() {
        let c = CronSchedule::parse("0 * * * * *", chrono_tz::UTC).unwrap();
        let last = utc(2026, 1, 1, 10, 0, 0);
        let trigger_t = utc(2026, 1, 1, 10, 1, 0);
        assert!(c.is_triggered(Some(last), trigger_t));
        // any t' >= trigger_t remains triggered
        for extra_secs in [0i64, 1, 60, 3600] {
            let t_prime = trigger_t + Duration::seconds(extra_secs);
            assert!(c.is_triggered(Some(last), t_prime));
        }
    }

    #[test]
    fn five_field_expression_is_accepted() {
        // the documented config form (no seconds field) must parse the
        // same as its 6-field equivalent.
        let five = CronSchedule::parse("*/5 * * * *", chrono_tz::UTC).unwrap();
        let six = CronSchedule::parse("0 */5 * * * *", chrono_tz::UTC).unwrap();
        let t = utc(2026, 1, 1, 10, 15, 0);
        assert_eq!(five.time_until_next_trigger(t), six.time_until_next_trigger(t));
    }

    #[test]
    fn time_until_next_trigger_is_positive() {
        let c = CronSchedule::parse("0 0 * * * *", chrono_tz::UTC).unwrap();
        let t = utc(2026, 1, 1, 10, 15, 0);
        let until = c.time_until_next_trigger(t).unwrap();
        assert!(until > Duration::zero());
    }
}
