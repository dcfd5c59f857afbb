//! DocumentStore - widget を JSON document として bucket に置く
//!
//! key は `widgets/{owner}/{widgetId}`（owner は正規化済み）です。
//! put も delete も同じ key を使うので、同じ owner なら delete で確実に消えます。

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

use crate::domain::{Widget, WidgetKey};
use crate::ports::{ObjectStore, ObjectStoreError, StorageError, WidgetStore};

pub const DOCUMENT_PREFIX: &str = "widgets";
pub const DOCUMENT_CONTENT_TYPE: &str = "application/json";

/// Object key for a widget document.
pub fn document_key(key: &WidgetKey) -> String {
    format!("{DOCUMENT_PREFIX}/{}/{}", key.owner_segment(), key.id())
}

pub struct DocumentStore {
    client: Arc<dyn ObjectStore>,
    bucket: String,
}

impl DocumentStore {
    pub fn new(client: Arc<dyn ObjectStore>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }
}

#[async_trait]
impl WidgetStore for DocumentStore {
    fn describe(&self) -> String {
        format!("document bucket `{}`", self.bucket)
    }

    async fn put(&self, widget: &Widget) -> Result<(), StorageError> {
        let key = document_key(widget.key());
        let body = serde_json::to_vec(&widget.to_document()).map_err(|source| {
            StorageError::Encode {
                widget_id: widget.id().to_string(),
                source,
            }
        })?;
        self.client
            .put(&self.bucket, &key, Bytes::from(body), DOCUMENT_CONTENT_TYPE)
            .await?;
        tracing::debug!(bucket = %self.bucket, key = %key, "document written");
        Ok(())
    }

    async fn delete(&self, key: &WidgetKey) -> Result<(), StorageError> {
        let object_key = document_key(key);
        match self.client.delete(&self.bucket, &object_key).await {
            Ok(()) => {
                tracing::debug!(bucket = %self.bucket, key = %object_key, "document deleted");
                Ok(())
            }
            Err(ObjectStoreError::NotFound { .. }) => {
                tracing::debug!(bucket = %self.bucket, key = %object_key, "document already absent");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::{WIDGET_ID, sample_bytes};
    use crate::domain::{Request, ValidationMode};
    use crate::impls::MemoryObjectStore;
    use crate::ports::ObjectBody;
    use serde_json::{Value, json};

    fn sample_widget() -> Widget {
        Request::decode(&sample_bytes(), ValidationMode::Strict)
            .unwrap()
            .into_widget()
    }

    #[tokio::test]
    async fn put_writes_flattened_json_under_owner_prefix() {
        let objects = Arc::new(MemoryObjectStore::new());
        let store = DocumentStore::new(objects.clone(), "widgets-web");
        store.put(&sample_widget()).await.unwrap();

        let key = format!("widgets/mary-matthews/{WIDGET_ID}");
        assert_eq!(objects.keys("widgets-web").await, vec![key.clone()]);
        assert_eq!(
            objects.content_type("widgets-web", &key).await.as_deref(),
            Some("application/json")
        );

        let body = objects.get("widgets-web", &key).await.unwrap();
        let doc: Value = serde_json::from_slice(&body.data).unwrap();
        assert_eq!(doc["widgetId"], json!(WIDGET_ID));
        assert_eq!(doc["owner"], json!("Mary Matthews"));
        assert_eq!(doc["rating"], json!("2.580677"));
        assert!(doc.get("otherAttributes").is_none());
        assert!(doc.get("type").is_none());
    }

    #[tokio::test]
    async fn put_twice_keeps_one_document() {
        let objects = Arc::new(MemoryObjectStore::new());
        let store = DocumentStore::new(objects.clone(), "b");
        let widget = sample_widget();
        let key = document_key(widget.key());

        store.put(&widget).await.unwrap();
        let first = objects.get("b", &key).await.unwrap();
        store.put(&widget).await.unwrap();
        let second = objects.get("b", &key).await.unwrap();

        assert_eq!(objects.keys("b").await, vec![key]);
        assert_eq!(first, second);
    }

    /// Client whose delete reports `NotFound` for a key it does not hold.
    struct StrictDeleteStore(MemoryObjectStore);

    #[async_trait]
    impl ObjectStore for StrictDeleteStore {
        async fn list_keys(
            &self,
            bucket: &str,
            max_keys: usize,
        ) -> Result<Vec<String>, ObjectStoreError> {
            self.0.list_keys(bucket, max_keys).await
        }

        async fn get(&self, bucket: &str, key: &str) -> Result<ObjectBody, ObjectStoreError> {
            self.0.get(bucket, key).await
        }

        async fn put(
            &self,
            bucket: &str,
            key: &str,
            data: Bytes,
            content_type: &str,
        ) -> Result<(), ObjectStoreError> {
            self.0.put(bucket, key, data, content_type).await
        }

        async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
            self.0.get(bucket, key).await?;
            self.0.delete(bucket, key).await
        }
    }

    #[tokio::test]
    async fn delete_of_missing_document_succeeds_when_client_reports_not_found() {
        let store = DocumentStore::new(Arc::new(StrictDeleteStore(MemoryObjectStore::new())), "b");
        let widget = sample_widget();
        store.delete(widget.key()).await.unwrap();

        store.put(&widget).await.unwrap();
        store.delete(widget.key()).await.unwrap();
        store.delete(widget.key()).await.unwrap();
    }

    #[tokio::test]
    async fn delete_propagates_other_client_failures() {
        struct DownStore;

        #[async_trait]
        impl ObjectStore for DownStore {
            async fn list_keys(&self, _: &str, _: usize) -> Result<Vec<String>, ObjectStoreError> {
                Ok(Vec::new())
            }

            async fn get(&self, bucket: &str, key: &str) -> Result<ObjectBody, ObjectStoreError> {
                Err(ObjectStoreError::NotFound {
                    bucket: bucket.into(),
                    key: key.into(),
                })
            }

            async fn put(&self, _: &str, _: &str, _: Bytes, _: &str) -> Result<(), ObjectStoreError> {
                Ok(())
            }

            async fn delete(&self, _: &str, _: &str) -> Result<(), ObjectStoreError> {
                Err(ObjectStoreError::OperationFailed("backend down".into()))
            }
        }

        let store = DocumentStore::new(Arc::new(DownStore), "b");
        let err = store.delete(sample_widget().key()).await.unwrap_err();
        assert!(matches!(
            err,
            StorageError::ObjectStore(ObjectStoreError::OperationFailed(_))
        ));
    }

    #[tokio::test]
    async fn delete_uses_the_same_key_and_tolerates_absence() {
        let objects = Arc::new(MemoryObjectStore::new());
        let store = DocumentStore::new(objects.clone(), "b");
        let widget = sample_widget();
        store.put(&widget).await.unwrap();
        store.delete(widget.key()).await.unwrap();
        assert!(objects.keys("b").await.is_empty());
        store.delete(widget.key()).await.unwrap();
    }
}
