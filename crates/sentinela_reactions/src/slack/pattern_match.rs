//! Ported from `src/services/slack/pattern_match.py`: a ranked list of
//! regexes, each matched in order against an inbound chat message and
//! translated into a request action. The original returns a bound
//! coroutine; here it returns a typed `SlackCommand` the caller (the
//! Controller's action-request path) turns into a queued `request` message.

use regex::Regex;
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlackCommand {
    DisableMonitor { name: String },
    EnableMonitor { name: String },
    AlertAcknowledge { alert_id: i64 },
    AlertLock { alert_id: i64 },
    AlertSolve { alert_id: i64 },
    IssueDrop { issue_id: i64 },
    ResendNotifications,
}

struct Pattern {
    regex: Regex,
    build: fn(&regex::Captures) -> Option<SlackCommand>,
}

fn parse_id(capture: &str) -> Option<i64> {
    capture.parse().ok()
}

fn patterns() -> &'static [Pattern] {
    static PATTERNS: OnceLock<Vec<Pattern>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        vec![
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?disable monitor +(\w+)").unwrap(),
                build: |c| Some(SlackCommand::DisableMonitor { name: c[1].to_string() }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?enable monitor +(\w+)").unwrap(),
                build: |c| Some(SlackCommand::EnableMonitor { name: c[1].to_string() }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?ack +(\d+)").unwrap(),
                build: |c| Some(SlackCommand::AlertAcknowledge { alert_id: parse_id(&c[1])? }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?lock +(\d+)").unwrap(),
                build: |c| Some(SlackCommand::AlertLock { alert_id: parse_id(&c[1])? }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?solve +(\d+)").unwrap(),
                build: |c| Some(SlackCommand::AlertSolve { alert_id: parse_id(&c[1])? }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?drop issue +(\d+)").unwrap(),
                build: |c| Some(SlackCommand::IssueDrop { issue_id: parse_id(&c[1])? }),
            },
            Pattern {
                regex: Regex::new(r"^(?:<@\w+>)? ?resend notifications").unwrap(),
                build: |_| Some(SlackCommand::ResendNotifications),
            },
        ]
    })
}

/// First pattern that matches `message` and parses cleanly, in declaration
/// order, or `None`. A pattern whose shape matches but whose captured id
/// overflows `i64` (`build` returns `None`) is treated as a non-match
/// rather than panicking the caller.
pub fn parse_command(message: &str) -> Option<SlackCommand> {
    for pattern in patterns() {
        if let Some(captures) = pattern.regex.captures(message) {
            if let Some(command) = (pattern.build)(&captures) {
                return Some(command);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ack_with_mention_prefix() {
        assert_eq!(
            parse_command("<@U123> ack 42"),
            Some(SlackCommand::AlertAcknowledge { alert_id: 42 })
        );
    }

    #[test]
    fn matches_solve_without_mention() {
        assert_eq!(parse_command("solve 7"), Some(SlackCommand::AlertSolve { alert_id: 7 }));
    }

    #[test]
    fn matches_disable_monitor() {
        assert_eq!(
            parse_command("disable monitor my_monitor"),
            Some(SlackCommand::DisableMonitor { name: "my_monitor".to_string() })
        );
    }

    #[test]
    fn matches_resend_notifications() {
        assert_eq!(parse_command("resend notifications"), Some(SlackCommand::ResendNotifications));
    }

    #[test]
    fn no_match_returns_none() {
        assert_eq!(parse_command("hello there"), None);
    }

    #[test]
    fn oversized_id_is_rejected_without_panicking() {
        assert_eq!(parse_command("ack 99999999999999999999999"), None);
    }

    #[test]
    fn first_matching_pattern_wins() {
        // "ack" is checked before "lock"/"solve"; a message matching only
        // "drop issue" should resolve to IssueDrop, not fall through.
        assert_eq!(parse_command("drop issue 3"), Some(SlackCommand::IssueDrop { issue_id: 3 }));
    }
}
