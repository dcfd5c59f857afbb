//! Source port - 未処理 request の取得元
//!
//! # 実装
//! - **BucketSource**: bucket の最小 key を 1 件ずつ取得、ack = object 削除
//! - **QueueSource**: long-poll でまとめて受信、ack = receipt handle で削除
//!
//! どちらも at-least-once です。write 成功後・ack 前にプロセスが落ちると
//! 同じ request が再配送されます。

use std::fmt;

use async_trait::async_trait;
use bytes::Bytes;

use super::message_queue::QueueError;
use super::object_store::ObjectStoreError;

/// Opaque token that removes a delivery from its source.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AckToken(String);

impl AckToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AckToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One unit of pending work: the raw body and how to acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub body: Bytes,
    pub token: AckToken,
}

impl Delivery {
    pub fn new(body: impl Into<Bytes>, token: AckToken) -> Self {
        Self {
            body: body.into(),
            token,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("bucket source: {0}")]
    ObjectStore(#[from] ObjectStoreError),

    #[error("queue source: {0}")]
    Queue(#[from] QueueError),
}

#[async_trait]
pub trait Source: Send + Sync {
    /// Human-readable location for logs.
    fn describe(&self) -> String;

    /// Zero or more pending deliveries. Empty means "no work right now".
    async fn fetch(&self) -> Result<Vec<Delivery>, SourceError>;

    async fn ack(&self, token: &AckToken) -> Result<(), SourceError>;
}
