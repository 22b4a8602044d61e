//! In-process queue, grounded on `message_queue/internal_queue.py`:
//! `tokio::sync::mpsc` stands in for `asyncio.Queue`, bounded `get_message`
//! wait via `tokio::time::timeout` stands in for `asyncio.wait_for`.
//! `change_visibility`/`delete_message` are no-ops, same as the original.

use crate::{Message, Queue, RawMessage};
use async_trait::async_trait;
use sentinela_core::SentinelaResult;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::sync::mpsc;

pub struct InternalQueue {
    sender: mpsc::UnboundedSender<RawMessage>,
    receiver: Mutex<mpsc::UnboundedReceiver<RawMessage>>,
    wait_time: Duration,
}

impl InternalQueue {
    pub fn new(wait_time: Duration) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Mutex::new(receiver),
            wait_time,
        }
    }
}

#[async_trait]
impl Queue for InternalQueue {
    async fn init(&self) -> SentinelaResult<()> {
        tracing::info!("internal queue ready");
        Ok(())
    }

    async fn send_message(&self, message_type: &str, payload: Value) -> SentinelaResult<()> {
        let message = RawMessage {
            message_type: message_type.to_string(),
            payload,
        };
        // An unbounded channel never blocks; a closed receiver would be a
        // programming error (the queue outlives every producer).
        let _ = self.sender.send(message);
        Ok(())
    }

    async fn get_message(&self) -> SentinelaResult<Option<Message>> {
        let mut receiver = self.receiver.lock().await;
        match tokio::time::timeout(self.wait_time, receiver.recv()).await {
            Ok(Some(content)) => Ok(Some(Message {
                id: uuid::Uuid::new_v4().to_string(),
                receipt: String::new(),
                content,
            })),
            Ok(None) => Ok(None),
            Err(_) => Ok(None),
        }
    }

    async fn change_visibility(&self, _message: &Message) -> SentinelaResult<()> {
        Ok(())
    }

    async fn delete_message(&self, _message: &Message) -> SentinelaResult<()> {
        Ok(())
    }

    fn queue_wait_message_time(&self) -> Duration {
        self.wait_time
    }
}
