//! WidgetStore port - widget の永続化先
//!
//! # 契約
//! - `put` は upsert（create と update の区別はない）
//! - `delete` は存在しない widget でも成功する
//! - 同じ widget の `put` を繰り返しても最終状態は 1 回と同じ（冪等）

use async_trait::async_trait;

use super::key_value::TableError;
use super::object_store::ObjectStoreError;
use crate::domain::{AttributeError, Widget, WidgetKey};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("document store: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("attribute store: {0}")]
    Table(#[from] TableError),

    #[error("failed to encode widget {widget_id}: {source}")]
    Encode {
        widget_id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("field `{field}` cannot be stored: {source}")]
    UnsupportedAttribute {
        field: String,
        #[source]
        source: AttributeError,
    },
}

#[async_trait]
pub trait WidgetStore: Send + Sync {
    /// Human-readable destination for logs.
    fn describe(&self) -> String;

    async fn put(&self, widget: &Widget) -> Result<(), StorageError>;

    async fn delete(&self, key: &WidgetKey) -> Result<(), StorageError>;
}
