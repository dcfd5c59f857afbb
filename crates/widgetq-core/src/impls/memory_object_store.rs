//! MemoryObjectStore - 開発・テスト用のオブジェクトストア
//!
//! bucket ごとに `BTreeMap` を持つので `list_keys` は自然に辞書順になります。

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::ports::{Clock, ObjectBody, ObjectStore, ObjectStoreError, SystemClock};

#[derive(Debug, Clone)]
struct StoredObject {
    data: Bytes,
    content_type: String,
    last_modified: DateTime<Utc>,
}

/// In-memory object store. Thread-safe via `RwLock`.
pub struct MemoryObjectStore {
    buckets: RwLock<HashMap<String, BTreeMap<String, StoredObject>>>,
    clock: Arc<dyn Clock>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Every key in `bucket`, sorted.
    pub async fn keys(&self, bucket: &str) -> Vec<String> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .map(|objects| objects.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub async fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.content_type.clone())
    }

    pub async fn last_modified(&self, bucket: &str, key: &str) -> Option<DateTime<Utc>> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| o.last_modified)
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn list_keys(
        &self,
        bucket: &str,
        max_keys: usize,
    ) -> Result<Vec<String>, ObjectStoreError> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .get(bucket)
            .map(|objects| objects.keys().take(max_keys).cloned().collect())
            .unwrap_or_default())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectBody, ObjectStoreError> {
        let buckets = self.buckets.read().await;
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|o| ObjectBody {
                data: o.data.clone(),
                content_type: Some(o.content_type.clone()),
            })
            .ok_or_else(|| ObjectStoreError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError> {
        if bucket.is_empty() || key.is_empty() {
            return Err(ObjectStoreError::InvalidKey(format!("{bucket}/{key}")));
        }
        let object = StoredObject {
            data,
            content_type: content_type.to_string(),
            last_modified: self.clock.now(),
        };
        let mut buckets = self.buckets.write().await;
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), object);
        Ok(())
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError> {
        let mut buckets = self.buckets.write().await;
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_get_delete() {
        let store = MemoryObjectStore::new();
        store
            .put("b", "k", Bytes::from_static(b"{}"), "application/json")
            .await
            .unwrap();
        let body = store.get("b", "k").await.unwrap();
        assert_eq!(body.data, Bytes::from_static(b"{}"));
        assert_eq!(body.content_type.as_deref(), Some("application/json"));

        store.delete("b", "k").await.unwrap();
        assert!(matches!(
            store.get("b", "k").await,
            Err(ObjectStoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn list_keys_is_sorted_and_limited() {
        let store = MemoryObjectStore::new();
        for key in ["0003", "0001", "0002"] {
            store.put("requests", key, Bytes::new(), "").await.unwrap();
        }
        assert_eq!(store.list_keys("requests", 1).await.unwrap(), vec!["0001"]);
        assert_eq!(store.list_keys("requests", 10).await.unwrap().len(), 3);
        assert!(store.list_keys("missing", 1).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = MemoryObjectStore::new();
        store.delete("nowhere", "nothing").await.unwrap();
    }
}
