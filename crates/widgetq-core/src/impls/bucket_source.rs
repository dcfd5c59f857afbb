//! BucketSource - bucket に置かれた request object を 1 件ずつ取り出す
//!
//! 辞書順で最小の key だけを返します。ack はその object の削除です。

use std::sync::Arc;

use async_trait::async_trait;

use crate::ports::{AckToken, Delivery, ObjectStore, ObjectStoreError, Source, SourceError};

pub struct BucketSource {
    client: Arc<dyn ObjectStore>,
    bucket: String,
}

impl BucketSource {
    pub fn new(client: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }
}

#[async_trait]
impl Source for BucketSource {
    fn describe(&self) -> String {
        format!("request bucket `{}`", self.bucket)
    }

    async fn fetch(&self) -> Result<Vec<Delivery>, SourceError> {
        let Some(key) = self.client.list_keys(&self.bucket, 1).await?.into_iter().next() else {
            return Ok(Vec::new());
        };
        match self.client.get(&self.bucket, &key).await {
            Ok(object) => Ok(vec![Delivery::new(object.data, AckToken::new(key))]),
            // removed between list and get
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %key, "object vanished before read");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn ack(&self, token: &AckToken) -> Result<(), SourceError> {
        self.client.delete(&self.bucket, token.as_str()).await?;
        Ok(())
    }
}
