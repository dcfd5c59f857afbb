//! Ingress - 外から届いた request を検証して配送キューに載せる
//!
//! 応答は HTTP 風の status code と JSON body です。
//! - 200 `{"MessageId": ...}`
//! - 400 `{"message": "Invalid JSON"}` / `{"message": "Invalid request data"}`
//! - 500 `{"message": <送信失敗の理由>}`

use std::sync::Arc;

use serde_json::{Value, json};

use crate::domain::{ValidationMode, validate};
use crate::ports::MessageQueue;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngressResponse {
    pub status_code: u16,
    pub body: String,
}

impl IngressResponse {
    fn new(status_code: u16, body: Value) -> Self {
        Self {
            status_code,
            body: body.to_string(),
        }
    }

    fn message(status_code: u16, message: &str) -> Self {
        Self::new(status_code, json!({ "message": message }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }
}

pub struct Ingress {
    queue: Arc<dyn MessageQueue>,
    queue_url: String,
}

impl Ingress {
    pub fn new(queue: Arc<dyn MessageQueue>, queue_url: impl Into<String>) -> Self {
        Self {
            queue,
            queue_url: queue_url.into(),
        }
    }

    /// Strictly validates `raw` and forwards it unchanged.
    pub async fn admit(&self, raw: &[u8]) -> IngressResponse {
        let value: Value = match serde_json::from_slice(raw) {
            Ok(value) => value,
            Err(e) => {
                tracing::info!(error = %e, "ingress: undecodable body");
                return IngressResponse::message(400, "Invalid JSON");
            }
        };
        if let Err(e) = validate(&value, ValidationMode::Strict) {
            tracing::info!(reason = %e, "ingress: invalid request");
            return IngressResponse::message(400, "Invalid request data");
        }

        let body = String::from_utf8_lossy(raw).into_owned();
        match self.queue.send_message(&self.queue_url, body).await {
            Ok(message_id) => {
                tracing::info!(message_id = %message_id, queue_url = %self.queue_url, "request queued");
                IngressResponse::new(200, json!({ "MessageId": message_id }))
            }
            Err(e) => {
                tracing::error!(queue_url = %self.queue_url, error = %e, "failed to queue request");
                IngressResponse::message(500, &e.to_string())
            }
        }
    }
}
