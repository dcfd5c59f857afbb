//! MessageQueue port - long-poll で受信する配送キュー
//!
//! # 設計原則
//! - at-least-once: 受信したメッセージは visibility timeout の間だけ隠れる
//! - ack は receipt handle による削除（handle は受信ごとに変わる）
//! - queue URL で複数キューを区別する

use std::time::Duration;

use async_trait::async_trait;

/// Upper bound for one receive batch.
pub const MAX_RECEIVE_BATCH: usize = 10;

#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("batch size must be between 1 and 10, got {0}")]
    InvalidBatchSize(usize),

    #[error("invalid queue url: {0}")]
    InvalidQueueUrl(String),

    #[error("receipt handle is unknown or expired: {0}")]
    InvalidReceipt(String),

    #[error("queue I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("queue operation failed: {0}")]
    OperationFailed(String),
}

/// One received message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub message_id: String,
    pub receipt_handle: String,
    pub body: String,
}

#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Enqueues `body` and returns its message id.
    async fn send_message(&self, queue_url: &str, body: String) -> Result<String, QueueError>;

    /// Waits up to `wait` for at least one message, returning at most `max_messages`.
    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError>;

    /// Deletes the message received under `receipt_handle`.
    async fn delete_message(&self, queue_url: &str, receipt_handle: &str)
        -> Result<(), QueueError>;
}

pub(crate) fn check_batch_size(max_messages: usize) -> Result<(), QueueError> {
    if max_messages == 0 || max_messages > MAX_RECEIVE_BATCH {
        return Err(QueueError::InvalidBatchSize(max_messages));
    }
    Ok(())
}
