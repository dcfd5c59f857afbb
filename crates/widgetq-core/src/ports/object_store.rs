//! ObjectStore port - bucket/key でアクセスするオブジェクトストア
//!
//! request の取得元（bucket source）、document backend、dead-letter の
//! 3 か所から同じ client を共有します。
//!
//! # 契約
//! - `list_keys` は辞書順で最大 `max_keys` 件
//! - `put` は上書き
//! - `delete` は存在しない key でも成功してよい（`NotFound` を返す実装もある）

use async_trait::async_trait;
use bytes::Bytes;

/// ObjectStoreError はオブジェクトストア操作のエラー
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("object not found: {bucket}/{key}")]
    NotFound { bucket: String, key: String },

    #[error("invalid bucket or key: {0}")]
    InvalidKey(String),

    #[error("object store I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("object store operation failed: {0}")]
    OperationFailed(String),
}

/// A retrieved object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectBody {
    pub data: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Up to `max_keys` keys of `bucket` in ascending lexicographic order.
    async fn list_keys(&self, bucket: &str, max_keys: usize)
        -> Result<Vec<String>, ObjectStoreError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<ObjectBody, ObjectStoreError>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        data: Bytes,
        content_type: &str,
    ) -> Result<(), ObjectStoreError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), ObjectStoreError>;
}
