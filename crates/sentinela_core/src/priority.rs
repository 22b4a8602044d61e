//! Alert priority levels and the pluggable rules that compute them.
//!
//! `AgeRule | CountRule | ValueRule` are expressed as a tagged enum with a
//! single `calculate` operation, per the Design Note in `spec.md` §9
//! ("Dynamic dispatch on rule variants").

use crate::models::Issue;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `informational < low < moderate < high < critical`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Informational,
    Low,
    Moderate,
    High,
    Critical,
}

impl Priority {
    pub const ALL: [Priority; 5] = [
        Priority::Informational,
        Priority::Low,
        Priority::Moderate,
        Priority::High,
        Priority::Critical,
    ];
}

/// Per-level thresholds; a missing level is skipped entirely when computing
/// the highest satisfied priority.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriorityLevels<T> {
    pub informational: Option<T>,
    pub low: Option<T>,
    pub moderate: Option<T>,
    pub high: Option<T>,
    pub critical: Option<T>,
}

impl<T: Copy> PriorityLevels<T> {
    pub fn get(&self, priority: Priority) -> Option<T> {
        match priority {
            Priority::Informational => self.informational,
            Priority::Low => self.low,
            Priority::Moderate => self.moderate,
            Priority::High => self.high,
            Priority::Critical => self.critical,
        }
    }

    /// Iterate from `critical` down to `informational` — the order in which
    /// a rule should test thresholds so it returns the *highest* satisfied
    /// level.
    pub fn highest_first(&self) -> impl Iterator<Item = (Priority, T)> + '_ {
        Priority::ALL
            .iter()
            .rev()
            .filter_map(move |&p| self.get(p).map(|t| (p, t)))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ValueOperation {
    GreaterThan,
    LesserThan,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum Rule {
    /// Priority = highest level whose `threshold_seconds` is exceeded by
    /// the oldest active issue.
    Age { levels: PriorityLevels<i64> },
    /// Priority = highest level whose `threshold_count` is <= the number
    /// of active issues.
    Count { levels: PriorityLevels<u64> },
    /// Priority = highest level whose threshold is satisfied by any
    /// issue's `data[value_key]`, under `operation`.
    Value {
        value_key: String,
        operation: ValueOperation,
        levels: PriorityLevels<f64>,
    },
}

impl Rule {
    pub fn calculate(&self, issues: &[Issue], now: DateTime<Utc>) -> Option<Priority> {
        match self {
            Rule::Age { levels } => {
                let oldest = issues.iter().map(|i| i.created_at).min()?;
                let age_seconds = (now - oldest).num_seconds();
                levels
                    .highest_first()
                    .find(|(_, threshold)| age_seconds > *threshold)
                    .map(|(p, _)| p)
            }
            Rule::Count { levels } => {
                let count = issues.len() as u64;
                levels
                    .highest_first()
                    .find(|(_, threshold)| count >= *threshold)
                    .map(|(p, _)| p)
            }
            Rule::Value {
                value_key,
                operation,
                levels,
            } => {
                let values: Vec<f64> = issues
                    .iter()
                    .filter_map(|issue| issue.data.get(value_key))
                    .filter_map(|v| v.as_f64())
                    .collect();

                if values.is_empty() {
                    return None;
                }

                levels
                    .highest_first()
                    .find(|(_, threshold)| {
                        values.iter().any(|v| match operation {
                            ValueOperation::GreaterThan => *v > *threshold,
                            ValueOperation::LesserThan => *v < *threshold,
                        })
                    })
                    .map(|(p, _)| p)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::IssueStatus;
    use chrono::Duration;

    fn issue(id: i64, data: serde_json::Value, age_secs: i64, now: DateTime<Utc>) -> Issue {
        Issue {
            id,
            monitor_id: 1,
            alert_id: None,
            model_id: format!("m{id}"),
            status: IssueStatus::Active,
            data,
            created_at: now - Duration::seconds(age_secs),
            solved_at: None,
            dropped_at: None,
        }
    }

    #[test]
    fn count_rule_picks_highest_satisfied_level() {
        let now = Utc::now();
        let rule = Rule::Count {
            levels: PriorityLevels {
                informational: Some(2),
                low: Some(4),
                moderate: None,
                high: None,
                critical: None,
            },
        };
        let issues: Vec<Issue> = (0..3).map(|i| issue(i, serde_json::json!({}), 0, now)).collect();
        assert_eq!(rule.calculate(&issues, now), Some(Priority::Informational));

        let issues: Vec<Issue> = (0..5).map(|i| issue(i, serde_json::json!({}), 0, now)).collect();
        assert_eq!(rule.calculate(&issues, now), Some(Priority::Low));
    }

    #[test]
    fn count_rule_none_below_lowest_threshold() {
        let now = Utc::now();
        let rule = Rule::Count {
            levels: PriorityLevels {
                informational: Some(2),
                low: None,
                moderate: None,
                high: None,
                critical: None,
            },
        };
        let issues: Vec<Issue> = (0..1).map(|i| issue(i, serde_json::json!({}), 0, now)).collect();
        assert_eq!(rule.calculate(&issues, now), None);
    }

    #[test]
    fn age_rule_uses_oldest_issue() {
        let now = Utc::now();
        let rule = Rule::Age {
            levels: PriorityLevels {
                informational: Some(60),
                low: Some(3600),
                moderate: None,
                high: None,
                critical: None,
            },
        };
        let issues = vec![issue(1, serde_json::json!({}), 10, now), issue(2, serde_json::json!({}), 4000, now)];
        assert_eq!(rule.calculate(&issues, now), Some(Priority::Low));
    }

    #[test]
    fn value_rule_greater_than() {
        let now = Utc::now();
        let rule = Rule::Value {
            value_key: "lag".into(),
            operation: ValueOperation::GreaterThan,
            levels: PriorityLevels {
                informational: Some(10.0),
                low: Some(100.0),
                moderate: None,
                high: None,
                critical: None,
            },
        };
        let issues = vec![
            issue(1, serde_json::json!({"lag": 5}), 0, now),
            issue(2, serde_json::json!({"lag": 150}), 0, now),
        ];
        assert_eq!(rule.calculate(&issues, now), Some(Priority::Low));
    }

    #[test]
    fn value_rule_missing_key_yields_none() {
        let now = Utc::now();
        let rule = Rule::Value {
            value_key: "lag".into(),
            operation: ValueOperation::GreaterThan,
            levels: PriorityLevels {
                informational: Some(10.0),
                low: None,
                moderate: None,
                high: None,
                critical: None,
            },
        };
        let issues = vec![issue(1, serde_json::json!({}), 0, now)];
        assert_eq!(rule.calculate(&issues, now), None);
    }
}
