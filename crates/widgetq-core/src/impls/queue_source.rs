//! QueueSource - 配送キューから long-poll でまとめて受信する

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::ports::{AckToken, Delivery, MessageQueue, Source, SourceError};

pub const DEFAULT_MAX_MESSAGES: usize = 10;
pub const DEFAULT_WAIT_TIME: Duration = Duration::from_secs(20);

pub struct QueueSource {
    client: Arc<dyn MessageQueue>,
    queue_url: String,
    max_messages: usize,
    wait_time: Duration,
}

impl QueueSource {
    pub fn new(client: Arc<dyn MessageQueue>, queue_url: impl Into<String>) -> Self {
        Self {
            client,
            queue_url: queue_url.into(),
            max_messages: DEFAULT_MAX_MESSAGES,
            wait_time: DEFAULT_WAIT_TIME,
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages;
        self
    }

    pub fn with_wait_time(mut self, wait_time: Duration) -> Self {
        self.wait_time = wait_time;
        self
    }
}

#[async_trait]
impl Source for QueueSource {
    fn describe(&self) -> String {
        format!("request queue `{}`", self.queue_url)
    }

    async fn fetch(&self) -> Result<Vec<Delivery>, SourceError> {
        let messages = self
            .client
            .receive_messages(&self.queue_url, self.max_messages, self.wait_time)
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| {
                tracing::trace!(message_id = %m.message_id, "message received");
                Delivery::new(m.body.into_bytes(), AckToken::new(m.receipt_handle))
            })
            .collect())
    }

    async fn ack(&self, token: &AckToken) -> Result<(), SourceError> {
        self.client
            .delete_message(&self.queue_url, token.as_str())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemoryMessageQueue;
    use crate::ports::QueueError;

    const URL: &str = "memory://requests";

    #[tokio::test]
    async fn fetch_maps_receipts_to_tokens() {
        let queue = Arc::new(InMemoryMessageQueue::new());
        for body in ["a", "b", "c"] {
            queue.send_message(URL, body.into()).await.unwrap();
        }
        let source = QueueSource::new(queue.clone(), URL)
            .with_max_messages(2)
            .with_wait_time(Duration::ZERO);

        let batch = source.fetch().await.unwrap();
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].body.as_ref(), b"a");

        for delivery in &batch {
            source.ack(&delivery.token).await.unwrap();
        }
        assert_eq!(queue.len(URL).await, 1);
    }

    #[tokio::test]
    async fn ack_with_unknown_token_fails() {
        let source = QueueSource::new(Arc::new(InMemoryMessageQueue::new()), URL);
        let err = source.ack(&AckToken::new("nope")).await.unwrap_err();
        assert!(matches!(
            err,
            SourceError::Queue(QueueError::InvalidReceipt(_))
        ));
    }

    #[tokio::test]
    async fn oversized_batch_is_a_queue_error() {
        let source = QueueSource::new(Arc::new(InMemoryMessageQueue::new()), URL)
            .with_max_messages(11)
            .with_wait_time(Duration::ZERO);
        assert!(matches!(
            source.fetch().await,
            Err(SourceError::Queue(QueueError::InvalidBatchSize(11)))
        ));
    }
}
