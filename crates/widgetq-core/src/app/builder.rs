//! AppBuilder - ports の実装を選んで DispatchLoop を組み立てる
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）: source / storage のどちらかが欠けたら build できない
//! - `from_config` はローカル backend（`LocalBackends`）で全体を配線する

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use super::dispatch_loop::{DEFAULT_IDLE_INTERVAL, DispatchLoop};
use super::router::{RejectPolicy, Router};
use crate::config::{Config, ConfigError, SourceConfig, StorageKind};
use crate::domain::ValidationMode;
use crate::impls::{
    AttributeStore, BucketDeadLetter, BucketSource, DocumentStore, FsObjectStore, FsTable,
    QueueSource, SpoolQueue,
};
use crate::ports::{DeadLetterSink, Source, WidgetStore};

/// BuildError はアプリケーション構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no request source configured")]
    MissingSource,

    #[error("no storage backend configured")]
    MissingStorage,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Filesystem-backed clients rooted at one directory.
///
/// - `{root}/buckets/{bucket}/...`
/// - `{root}/tables/{table}/{id}.json`
/// - `{root}/queues/{name}/...`
#[derive(Clone)]
pub struct LocalBackends {
    pub objects: Arc<FsObjectStore>,
    pub tables: Arc<FsTable>,
    pub queues: Arc<SpoolQueue>,
}

impl LocalBackends {
    pub fn open(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            objects: Arc::new(FsObjectStore::new(root.join("buckets"))),
            tables: Arc::new(FsTable::new(root.join("tables"))),
            queues: Arc::new(SpoolQueue::new(PathBuf::from(root))),
        }
    }
}

/// AppBuilder はアプリケーションを構築
///
/// # 使用例
/// ```ignore
/// let dispatch = AppBuilder::new()
///     .source(Arc::new(BucketSource::new(objects.clone(), "requests")))
///     .storage(Arc::new(DocumentStore::new(objects, "widgets-web")))
///     .build()?;
/// ```
#[derive(Default)]
pub struct AppBuilder {
    source: Option<Arc<dyn Source>>,
    store: Option<Arc<dyn WidgetStore>>,
    reject_policy: RejectPolicy,
    validation: ValidationMode,
    idle_interval: Option<Duration>,
}

impl AppBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(mut self, source: Arc<dyn Source>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn storage(mut self, store: Arc<dyn WidgetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn dead_letter(mut self, sink: Arc<dyn DeadLetterSink>) -> Self {
        self.reject_policy = RejectPolicy::DeadLetter(sink);
        self
    }

    pub fn validation(mut self, mode: ValidationMode) -> Self {
        self.validation = mode;
        self
    }

    pub fn idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = Some(idle_interval);
        self
    }

    /// Wires every piece from `config` over the local backends in `backends`.
    pub fn from_config(config: &Config, backends: &LocalBackends) -> Result<Self, BuildError> {
        config.validate()?;

        let source: Arc<dyn Source> = match &config.source {
            SourceConfig::Bucket { bucket } => {
                Arc::new(BucketSource::new(backends.objects.clone(), bucket.clone()))
            }
            SourceConfig::Queue {
                queue_url,
                max_messages,
                wait_time,
            } => Arc::new(
                QueueSource::new(backends.queues.clone(), queue_url.clone())
                    .with_max_messages(*max_messages)
                    .with_wait_time(*wait_time),
            ),
        };

        let store: Arc<dyn WidgetStore> = match config.storage.kind {
            StorageKind::Document => Arc::new(DocumentStore::new(
                backends.objects.clone(),
                config.storage.destination.clone(),
            )),
            StorageKind::KeyValue => Arc::new(AttributeStore::new(
                backends.tables.clone(),
                config.storage.destination.clone(),
            )),
        };

        let mut builder = Self::new()
            .source(source)
            .storage(store)
            .validation(config.validation)
            .idle_interval(config.idle_interval);

        match &config.dead_letter_bucket {
            Some(bucket) => {
                builder = builder.dead_letter(Arc::new(BucketDeadLetter::new(
                    backends.objects.clone(),
                    bucket.clone(),
                )));
            }
            None if config.source.is_bucket() => {
                tracing::warn!(
                    "bucket source without a dead-letter bucket: an invalid request at the \
                     smallest key will block the bucket"
                );
            }
            None => {}
        }
        Ok(builder)
    }

    pub fn build(self) -> Result<DispatchLoop, BuildError> {
        let source = self.source.ok_or(BuildError::MissingSource)?;
        let store = self.store.ok_or(BuildError::MissingStorage)?;
        let router = Router::new(source, store)
            .with_reject_policy(self.reject_policy)
            .with_validation_mode(self.validation);
        Ok(DispatchLoop::new(Arc::new(router))
            .with_idle_interval(self.idle_interval.unwrap_or(DEFAULT_IDLE_INTERVAL)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::Tick;
    use crate::config::StorageConfig;
    use crate::domain::fixtures::{WIDGET_ID, sample_bytes, sample_request};
    use crate::domain::{Operation, RouteOutcome};
    use crate::impls::MemoryObjectStore;
    use crate::ports::{KeyValueTable, MessageQueue, ObjectStore};
    use bytes::Bytes;
    use rstest::rstest;

    #[test]
    fn build_without_source_fails() {
        let store = Arc::new(DocumentStore::new(Arc::new(MemoryObjectStore::new()), "b"));
        let err = AppBuilder::new().storage(store).build().err().unwrap();
        assert!(matches!(err, BuildError::MissingSource));
    }

    #[test]
    fn build_without_storage_fails() {
        let source = Arc::new(BucketSource::new(Arc::new(MemoryObjectStore::new()), "b"));
        let err = AppBuilder::new().source(source).build().err().unwrap();
        assert!(matches!(err, BuildError::MissingStorage));
    }

    #[test]
    fn invalid_config_fails_before_wiring() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(
            SourceConfig::bucket("requests"),
            StorageConfig {
                kind: StorageKind::Document,
                destination: String::new(),
            },
        );
        let err = AppBuilder::from_config(&config, &LocalBackends::open(dir.path()))
            .err()
            .unwrap();
        assert!(matches!(err, BuildError::Config(ConfigError::Empty(_))));
    }

    #[tokio::test]
    async fn bucket_to_document_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backends = LocalBackends::open(dir.path());
        backends
            .objects
            .put("requests", "0001", Bytes::from(sample_bytes()), "application/json")
            .await
            .unwrap();
        let config = Config::new(
            SourceConfig::bucket("requests"),
            StorageConfig {
                kind: StorageKind::Document,
                destination: "web".into(),
            },
        );

        let dispatch = AppBuilder::from_config(&config, &backends)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            dispatch.tick().await,
            Tick::Routed(vec![RouteOutcome::Acknowledged {
                operation: Operation::Created
            }])
        );
        assert!(
            dir.path()
                .join(format!("buckets/web/widgets/mary-matthews/{WIDGET_ID}"))
                .is_file()
        );
        assert_eq!(dispatch.tick().await, Tick::Idle);
    }

    #[rstest]
    #[case(".NET Team", "widgets/%2Enet-team")]
    #[case("Sales/", "widgets/sales/%")]
    #[tokio::test]
    async fn awkward_owners_are_stored_on_disk(#[case] owner: &str, #[case] dir_name: &str) {
        let dir = tempfile::tempdir().unwrap();
        let backends = LocalBackends::open(dir.path());
        let mut body = sample_request();
        body["owner"] = owner.into();
        backends
            .objects
            .put("requests", "0001", Bytes::from(body.to_string()), "application/json")
            .await
            .unwrap();
        let config = Config::new(
            SourceConfig::bucket("requests"),
            StorageConfig {
                kind: StorageKind::Document,
                destination: "web".into(),
            },
        );
        let dispatch = AppBuilder::from_config(&config, &backends)
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(
            dispatch.tick().await,
            Tick::Routed(vec![RouteOutcome::Acknowledged {
                operation: Operation::Created
            }])
        );
        assert!(
            dir.path()
                .join(format!("buckets/web/{dir_name}/{WIDGET_ID}"))
                .is_file()
        );
        assert!(backends.objects.list_keys("requests", 10).await.unwrap().is_empty());

        let mut delete = body.clone();
        delete["type"] = "delete".into();
        backends
            .objects
            .put("requests", "0002", Bytes::from(delete.to_string()), "application/json")
            .await
            .unwrap();
        assert_eq!(
            dispatch.tick().await,
            Tick::Routed(vec![RouteOutcome::Acknowledged {
                operation: Operation::Deleted
            }])
        );
        assert!(backends.objects.list_keys("web", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn queue_to_key_value_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let backends = LocalBackends::open(dir.path());
        let url = "https://queue.local/requests";
        backends
            .queues
            .send_message(url, String::from_utf8(sample_bytes()).unwrap())
            .await
            .unwrap();
        let mut config = Config::new(
            SourceConfig::queue(url),
            StorageConfig {
                kind: StorageKind::KeyValue,
                destination: "widgets".into(),
            },
        );
        config.source = SourceConfig::Queue {
            queue_url: url.into(),
            max_messages: 10,
            wait_time: Duration::ZERO,
        };

        let dispatch = AppBuilder::from_config(&config, &backends)
            .unwrap()
            .build()
            .unwrap();
        dispatch.tick().await;

        assert!(
            backends
                .tables
                .get_item("widgets", WIDGET_ID)
                .await
                .unwrap()
                .is_some()
        );
    }
}
