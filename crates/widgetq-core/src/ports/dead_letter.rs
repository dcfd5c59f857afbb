//! DeadLetterSink port - 受理できなかった request の退避先
//!
//! 不正な入力は ack せずに人が確認できる場所へ残します。
//! 退避に成功した場合だけ source から ack されます。

use async_trait::async_trait;

use super::storage::StorageError;

#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Stores the raw body with the rejection reason; returns where it went.
    async fn park(&self, body: &[u8], reason: &str) -> Result<String, StorageError>;
}
