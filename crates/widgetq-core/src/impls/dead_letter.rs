//! BucketDeadLetter - 拒否した request を bucket に退避する
//!
//! key は `rejected/{UTC timestamp}-{ulid}`、中身は理由と元の body の JSON です。
//! body が UTF-8 でなければ lossy 変換して残します。

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use crate::ports::{
    Clock, DeadLetterSink, IdGenerator, ObjectStore, StorageError, SystemClock, UlidGenerator,
};

pub const REJECTED_PREFIX: &str = "rejected";

#[derive(Serialize)]
struct ParkedRequest<'a> {
    reason: &'a str,
    body: &'a str,
}

pub struct BucketDeadLetter {
    client: Arc<dyn ObjectStore>,
    bucket: String,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl BucketDeadLetter {
    pub fn new(client: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self::with_clock(client, bucket, Arc::new(SystemClock))
    }

    pub fn with_clock(
        client: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl DeadLetterSink for BucketDeadLetter {
    async fn park(&self, body: &[u8], reason: &str) -> Result<String, StorageError> {
        let key = format!(
            "{REJECTED_PREFIX}/{}-{}",
            self.clock.now().format("%Y%m%dT%H%M%S%.3fZ"),
            self.ids.message_id()
        );
        let body = String::from_utf8_lossy(body);
        let parked = serde_json::to_vec(&ParkedRequest {
            reason,
            body: &body,
        })
        .map_err(|source| StorageError::Encode {
            widget_id: key.clone(),
            source,
        })?;
        self.client
            .put(&self.bucket, &key, Bytes::from(parked), "application/json")
            .await?;
        Ok(format!("{}/{key}", self.bucket))
    }
}
