//! The one bundled, concrete plugin: a Slack reaction and its inbound
//! command pattern-matcher, per the Design Note "Slack reaction pattern
//! matching" in `spec.md` §9 [ADD].

pub mod notifier;
pub mod pattern_match;

pub use notifier::SlackReaction;
pub use pattern_match::{parse_command, SlackCommand};
