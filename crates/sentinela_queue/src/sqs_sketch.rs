//! Interface-only sketch of an AWS SQS-backed `Queue`, gated behind
//! `sqs-queue`. Grounded on `src/plugins/aws/queue/sqs/sqs_queue.py`: the
//! message envelope, long-poll semantics, and a real visibility-timeout
//! extension/delete round-trip. Does not bundle the AWS SDK — per `spec.md`
//! §1 ("persistence layer ... described by contracts, not
//! implementations"), this documents the contract a real backend satisfies
//! rather than shipping one.

use crate::{Message, Queue};
use async_trait::async_trait;
use sentinela_core::errors::{ErrorCategory, ErrorKind, ErrorSeverity, SentinelaError};
use sentinela_core::SentinelaResult;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SqsQueueConfig {
    pub queue_url: String,
    pub wait_time: Duration,
    pub visibility_timeout: Duration,
}

/// A `Queue` implementation every method of which fails with
/// `QueueUnavailable` until a real AWS SDK client is wired in. Exists so the
/// `sqs-queue` feature demonstrates the shape of the contract — receipt
/// handles, long-poll wait time, explicit visibility-timeout extension —
/// without depending on `aws-sdk-sqs`.
pub struct SqsQueue {
    config: SqsQueueConfig,
}

impl SqsQueue {
    pub fn new(config: SqsQueueConfig) -> Self {
        Self { config }
    }

    fn unimplemented(&self, operation: &str) -> SentinelaError {
        SentinelaError::new(
            ErrorKind::QueueUnavailable,
            ErrorCategory::Queue,
            ErrorSeverity::High,
            format!("SqsQueue::{operation} requires a real AWS SQS client, none is wired in (queue_url='{}')", self.config.queue_url),
        )
    }
}

#[async_trait]
impl Queue for SqsQueue {
    async fn init(&self) -> SentinelaResult<()> {
        Err(self.unimplemented("init"))
    }

    async fn send_message(&self, _message_type: &str, _payload: Value) -> SentinelaResult<()> {
        Err(self.unimplemented("send_message"))
    }

    async fn get_message(&self) -> SentinelaResult<Option<Message>> {
        Err(self.unimplemented("get_message"))
    }

    async fn change_visibility(&self, _message: &Message) -> SentinelaResult<()> {
        Err(self.unimplemented("change_visibility"))
    }

    async fn delete_message(&self, _message: &Message) -> SentinelaResult<()> {
        Err(self.unimplemented("delete_message"))
    }

    fn queue_wait_message_time(&self) -> Duration {
        self.config.wait_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SqsQueueConfig {
        SqsQueueConfig {
            queue_url: "https://sqs.example.com/queue".to_string(),
            wait_time: Duration::from_secs(20),
            visibility_timeout: Duration::from_secs(30),
        }
    }

    #[tokio::test]
    async fn every_operation_reports_queue_unavailable_without_a_client() {
        let queue = SqsQueue::new(config());
        let error = queue.init().await.unwrap_err();
        assert_eq!(error.kind, ErrorKind::QueueUnavailable);
        assert_eq!(queue.queue_wait_message_time(), Duration::from_secs(20));
    }
}
