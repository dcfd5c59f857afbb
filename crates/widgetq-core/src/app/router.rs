//! Router - 1 件の delivery を検証・正規化して保存先へ振り分ける
//!
//! # フロー
//! 1. JSON decode + 検証（失敗 → reject policy に従う）
//! 2. kind で分岐: create/update → put、delete → delete、それ以外 → 無視して ack
//! 3. 保存に成功したら source で ack、失敗したら ack しない（再配送待ち）
//!
//! どの分岐でも panic せず、結果は `RouteOutcome` で返します。

use std::sync::Arc;

use tracing::Instrument;

use crate::domain::{Operation, Request, RequestKind, RouteOutcome, ValidationError, ValidationMode};
use crate::observability::{RouterStats, delivery_span};
use crate::ports::{DeadLetterSink, Delivery, Source, WidgetStore};

/// What to do with input that fails decoding or validation.
#[derive(Clone, Default)]
pub enum RejectPolicy {
    /// Leave it at the source. Queue redrive policies cap redelivery.
    #[default]
    Retain,
    /// Park the raw body with the reason, then acknowledge.
    DeadLetter(Arc<dyn DeadLetterSink>),
}

impl RejectPolicy {
    pub fn is_retain(&self) -> bool {
        matches!(self, Self::Retain)
    }
}

impl std::fmt::Debug for RejectPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Retain => f.write_str("Retain"),
            Self::DeadLetter(_) => f.write_str("DeadLetter"),
        }
    }
}

pub struct Router {
    source: Arc<dyn Source>,
    store: Arc<dyn WidgetStore>,
    reject_policy: RejectPolicy,
    mode: ValidationMode,
    stats: Arc<RouterStats>,
}

impl Router {
    pub fn new(source: Arc<dyn Source>, store: Arc<dyn WidgetStore>) -> Self {
        Self {
            source,
            store,
            reject_policy: RejectPolicy::default(),
            mode: ValidationMode::default(),
            stats: Arc::new(RouterStats::new()),
        }
    }

    pub fn with_reject_policy(mut self, policy: RejectPolicy) -> Self {
        self.reject_policy = policy;
        self
    }

    pub fn with_validation_mode(mut self, mode: ValidationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn source(&self) -> &Arc<dyn Source> {
        &self.source
    }

    pub fn store(&self) -> &Arc<dyn WidgetStore> {
        &self.store
    }

    pub fn stats(&self) -> Arc<RouterStats> {
        Arc::clone(&self.stats)
    }

    /// Handles one delivery end to end. Never panics on bad input.
    pub async fn route(&self, delivery: &Delivery) -> RouteOutcome {
        self.stats.record_fetched();
        self.route_inner(delivery)
            .instrument(delivery_span(delivery.token.as_str()))
            .await
    }

    async fn route_inner(&self, delivery: &Delivery) -> RouteOutcome {
        let request = match Request::decode(&delivery.body, self.mode) {
            Ok(request) => request,
            Err(error) => return self.reject(delivery, error).await,
        };

        let widget_id = request.key().id().to_string();
        let request_id = request
            .request_id()
            .map(ToString::to_string)
            .unwrap_or_default();

        let (operation, result) = match request.kind() {
            Some(RequestKind::Create) => {
                (Operation::Created, self.store.put(&request.into_widget()).await)
            }
            Some(RequestKind::Update) => {
                (Operation::Updated, self.store.put(&request.into_widget()).await)
            }
            Some(RequestKind::Delete) => (Operation::Deleted, self.store.delete(request.key()).await),
            None => {
                tracing::warn!(
                    kind = request.raw_kind(),
                    widget_id = %widget_id,
                    "unknown request type; acknowledging without storage"
                );
                (Operation::Ignored, Ok(()))
            }
        };

        if let Err(e) = result {
            self.stats.record_store_failure();
            tracing::error!(
                widget_id = %widget_id,
                request_id = %request_id,
                operation = %operation,
                destination = %self.store.describe(),
                error = %e,
                "storage failed; leaving request for redelivery"
            );
            return RouteOutcome::Unacknowledged {
                reason: e.to_string(),
            };
        }
        self.stats.record_operation(operation);

        match self.source.ack(&delivery.token).await {
            Ok(()) => {
                tracing::info!(
                    widget_id = %widget_id,
                    request_id = %request_id,
                    operation = %operation,
                    "request processed"
                );
                RouteOutcome::Acknowledged { operation }
            }
            Err(e) => {
                self.stats.record_ack_failure();
                tracing::warn!(
                    widget_id = %widget_id,
                    operation = %operation,
                    error = %e,
                    "stored but ack failed; request will be redelivered"
                );
                RouteOutcome::Unacknowledged {
                    reason: format!("ack failed: {e}"),
                }
            }
        }
    }

    async fn reject(&self, delivery: &Delivery, error: ValidationError) -> RouteOutcome {
        let reason = error.to_string();
        tracing::warn!(reason = %reason, "request rejected");

        let parked = match &self.reject_policy {
            RejectPolicy::Retain => false,
            RejectPolicy::DeadLetter(sink) => match sink.park(&delivery.body, &reason).await {
                Ok(location) => match self.source.ack(&delivery.token).await {
                    Ok(()) => {
                        tracing::info!(location = %location, "rejected request parked");
                        true
                    }
                    Err(e) => {
                        self.stats.record_ack_failure();
                        tracing::warn!(
                            location = %location,
                            error = %e,
                            "rejected request parked but ack failed"
                        );
                        false
                    }
                },
                Err(e) => {
                    tracing::error!(error = %e, "failed to park rejected request; leaving it at the source");
                    false
                }
            },
        };

        self.stats.record_rejected(parked);
        RouteOutcome::Rejected { reason, parked }
    }
}
