//! Slack webhook `ReactionAction` — the one concrete `reaction_options`
//! target bundled with the core, wired through the exact same
//! `ReactionAction` interface any other reaction implements (`spec.md` §9
//! [ADD]: "out of scope" covers arbitrary Slack plugins, not this one
//! illustrative wiring).

use crate::registry::ReactionAction;
use async_trait::async_trait;
use sentinela_core::errors::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use sentinela_core::options::ReactionPayload;
use sentinela_core::SentinelaResult;

pub struct SlackReaction {
    webhook_url: String,
    client: reqwest::Client,
}

impl SlackReaction {
    pub fn new(webhook_url: impl Into<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            client: reqwest::Client::new(),
        }
    }

    fn format_text(payload: &ReactionPayload) -> String {
        format!(
            "*{}* on {} #{} (monitor {})\n```{}```",
            payload.event_name,
            payload.event_source,
            payload.event_source_id,
            payload.event_source_monitor_id,
            payload.event_data
        )
    }
}

#[async_trait]
impl ReactionAction for SlackReaction {
    async fn run(&self, payload: &ReactionPayload) -> SentinelaResult<()> {
        let body = serde_json::json!({ "text": Self::format_text(payload) });

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                SentinelaError::new(
                    ErrorKind::ReactionFailed,
                    ErrorCategory::Network,
                    ErrorSeverity::Medium,
                    format!("slack webhook request failed: {e}"),
                )
            })?;

        if !response.status().is_success() {
            return Err(SentinelaError::new(
                ErrorKind::ReactionFailed,
                ErrorCategory::Network,
                ErrorSeverity::Medium,
                format!("slack webhook returned status {}", response.status()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_event_text() {
        let payload = ReactionPayload {
            event_source: "Alert".into(),
            event_source_id: 7,
            event_source_monitor_id: 3,
            event_name: "alert_created".into(),
            event_data: serde_json::json!({"priority": "low"}),
            extra_payload: None,
        };
        let text = SlackReaction::format_text(&payload);
        assert!(text.contains("alert_created"));
        assert!(text.contains("Alert"));
        assert!(text.contains("monitor 3"));
    }
}
