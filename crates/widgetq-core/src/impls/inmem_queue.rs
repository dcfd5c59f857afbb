//! InMemoryMessageQueue - 開発用の配送キュー
//!
//! # 学習ポイント
//! - Mutex + Notify による long-poll（send で待機中の receive を起こす）
//! - visibility timeout: 受信したメッセージは一定時間だけ隠れ、ack されなければ再び見える
//! - queue URL ごとに独立したキューを持つ（namespace）

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio::time::Instant;

use crate::ports::message_queue::check_batch_size;
use crate::ports::{
    Clock, IdGenerator, MessageQueue, QueueError, ReceivedMessage, SystemClock, UlidGenerator,
};

/// Default time a received message stays hidden.
pub const DEFAULT_VISIBILITY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct QueuedMessage {
    message_id: String,
    body: String,
    receipt_handle: Option<String>,
    visible_at: DateTime<Utc>,
    receive_count: u32,
}

/// In-memory queue with visibility timeouts.
pub struct InMemoryMessageQueue {
    queues: Mutex<HashMap<String, VecDeque<QueuedMessage>>>,
    notify: Notify,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    visibility_timeout: Duration,
}

impl InMemoryMessageQueue {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, visibility_timeout: Duration) -> Self {
        Self {
            queues: Mutex::new(HashMap::new()),
            notify: Notify::new(),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            visibility_timeout,
        }
    }

    /// Messages in the queue, visible or not.
    pub async fn len(&self, queue_url: &str) -> usize {
        self.queues
            .lock()
            .await
            .get(queue_url)
            .map(VecDeque::len)
            .unwrap_or(0)
    }

    pub async fn is_empty(&self, queue_url: &str) -> bool {
        self.len(queue_url).await == 0
    }

    /// How often the message with `message_id` has been received.
    pub async fn receive_count(&self, queue_url: &str, message_id: &str) -> Option<u32> {
        self.queues
            .lock()
            .await
            .get(queue_url)
            .and_then(|q| q.iter().find(|m| m.message_id == message_id))
            .map(|m| m.receive_count)
    }

    /// Claims up to `max` visible messages.
    async fn claim(&self, queue_url: &str, max: usize) -> Vec<ReceivedMessage> {
        let mut queues = self.queues.lock().await;
        let Some(queue) = queues.get_mut(queue_url) else {
            return Vec::new();
        };

        let now = self.clock.now();
        let hidden_until = hidden_until(now, self.visibility_timeout);

        let mut received = Vec::new();
        for message in queue.iter_mut() {
            if received.len() >= max {
                break;
            }
            if message.visible_at > now {
                continue;
            }
            let receipt = self.ids.receipt_handle().to_string();
            message.receipt_handle = Some(receipt.clone());
            message.visible_at = hidden_until;
            message.receive_count += 1;
            received.push(ReceivedMessage {
                message_id: message.message_id.clone(),
                receipt_handle: receipt,
                body: message.body.clone(),
            });
        }
        received
    }
}

pub(crate) fn hidden_until(now: DateTime<Utc>, visibility_timeout: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(visibility_timeout)
        .ok()
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

impl Default for InMemoryMessageQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageQueue for InMemoryMessageQueue {
    async fn send_message(&self, queue_url: &str, body: String) -> Result<String, QueueError> {
        let message_id = self.ids.message_id().to_string();
        {
            let mut queues = self.queues.lock().await;
            queues
                .entry(queue_url.to_string())
                .or_default()
                .push_back(QueuedMessage {
                    message_id: message_id.clone(),
                    body,
                    receipt_handle: None,
                    visible_at: self.clock.now(),
                    receive_count: 0,
                });
        }
        // Notify outside the lock
        self.notify.notify_one();
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        check_batch_size(max_messages)?;
        let deadline = Instant::now() + wait;
        loop {
            let received = self.claim(queue_url, max_messages).await;
            if !received.is_empty() {
                return Ok(received);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::select! {
                _ = self.notify.notified() => {},
                _ = tokio::time::sleep_until(deadline) => {},
            }
        }
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        let mut queues = self.queues.lock().await;
        let position = queues.get(queue_url).and_then(|q| {
            q.iter()
                .position(|m| m.receipt_handle.as_deref() == Some(receipt_handle))
        });
        match (queues.get_mut(queue_url), position) {
            (Some(queue), Some(index)) => {
                queue.remove(index);
                Ok(())
            }
            _ => Err(QueueError::InvalidReceipt(receipt_handle.to_string())),
        }
    }
}
