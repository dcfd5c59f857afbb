//! KeyValueTable port - attribute-typed key-value store
//!
//! item は `id` をキー属性に持つ `Item`（tagged attribute の map）です。

use async_trait::async_trait;

use crate::domain::Item;

/// Name of the key attribute every item carries.
pub const KEY_ATTRIBUTE: &str = "id";

#[derive(Debug, thiserror::Error)]
pub enum TableError {
    #[error("item has no string `id` attribute")]
    MissingKey,

    #[error("item not found: {table}/{key}")]
    NotFound { table: String, key: String },

    #[error("invalid table name or key: {0}")]
    InvalidKey(String),

    #[error("table I/O failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("item encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("table operation failed: {0}")]
    OperationFailed(String),
}

#[async_trait]
pub trait KeyValueTable: Send + Sync {
    /// Upsert by key attribute.
    async fn put_item(&self, table: &str, item: Item) -> Result<(), TableError>;

    /// Removes the item whose key attribute equals `key`. A missing item may
    /// succeed or report `NotFound`.
    async fn delete_item(&self, table: &str, key: &str) -> Result<(), TableError>;

    async fn get_item(&self, table: &str, key: &str) -> Result<Option<Item>, TableError>;
}

/// Reads the key attribute of an item.
pub fn item_key(item: &Item) -> Result<&str, TableError> {
    item.get(KEY_ATTRIBUTE)
        .and_then(|v| v.as_s())
        .ok_or(TableError::MissingKey)
}
