//! Config - 起動時に 1 回だけ決まる設定
//!
//! CLI（clap）が値を集め、`Config::validate` が起動を拒否すべき組み合わせを弾きます。

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::app::dispatch_loop::DEFAULT_IDLE_INTERVAL;
use crate::domain::ValidationMode;
use crate::impls::queue_source::{DEFAULT_MAX_MESSAGES, DEFAULT_WAIT_TIME};
use crate::ports::message_queue::MAX_RECEIVE_BATCH;

/// Longest long-poll a queue receive may ask for.
pub const MAX_WAIT_TIME: Duration = Duration::from_secs(20);

pub const DEFAULT_DATA_ROOT: &str = ".widgetq";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no request source: set either a request bucket or a queue url")]
    MissingSource,

    #[error("request bucket and queue url are mutually exclusive")]
    ConflictingSources,

    #[error("`{0}` must not be empty")]
    Empty(&'static str),

    #[error("max messages must be between 1 and 10, got {0}")]
    InvalidBatchSize(usize),

    #[error("wait time must be at most 20s, got {0:?}")]
    InvalidWaitTime(Duration),

    #[error("dead letter bucket `{0}` is also the request bucket")]
    DeadLetterIsSource(String),

    #[error("document bucket `{0}` is also the request bucket")]
    DestinationIsSource(String),

    #[error("unknown {what} `{value}`")]
    UnknownValue { what: &'static str, value: String },
}

/// Where pending requests come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceConfig {
    Bucket {
        bucket: String,
    },
    Queue {
        queue_url: String,
        max_messages: usize,
        wait_time: Duration,
    },
}

impl SourceConfig {
    pub fn bucket(bucket: impl Into<String>) -> Self {
        Self::Bucket {
            bucket: bucket.into(),
        }
    }

    pub fn queue(queue_url: impl Into<String>) -> Self {
        Self::Queue {
            queue_url: queue_url.into(),
            max_messages: DEFAULT_MAX_MESSAGES,
            wait_time: DEFAULT_WAIT_TIME,
        }
    }

    /// Picks exactly one of the two optional sources.
    pub fn select(
        bucket: Option<String>,
        queue_url: Option<String>,
        max_messages: usize,
        wait_time: Duration,
    ) -> Result<Self, ConfigError> {
        match (bucket, queue_url) {
            (Some(bucket), None) => Ok(Self::Bucket { bucket }),
            (None, Some(queue_url)) => Ok(Self::Queue {
                queue_url,
                max_messages,
                wait_time,
            }),
            (Some(_), Some(_)) => Err(ConfigError::ConflictingSources),
            (None, None) => Err(ConfigError::MissingSource),
        }
    }

    pub fn is_bucket(&self) -> bool {
        matches!(self, Self::Bucket { .. })
    }
}

/// Which storage backend widgets go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// JSON documents in an object-store bucket.
    Document,
    /// Tagged attribute items in a key-value table.
    KeyValue,
}

impl StorageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Document => "document",
            Self::KeyValue => "key-value",
        }
    }
}

impl fmt::Display for StorageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StorageKind {
    type Err = ConfigError;

    /// Accepts the historical names `s3` and `dynamodb` too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "document" | "s3" => Ok(Self::Document),
            "key-value" | "keyvalue" | "dynamodb" => Ok(Self::KeyValue),
            _ => Err(ConfigError::UnknownValue {
                what: "storage strategy",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub kind: StorageKind,
    /// Bucket name for documents, table name for key-value.
    pub destination: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub source: SourceConfig,
    pub storage: StorageConfig,
    pub dead_letter_bucket: Option<String>,
    pub idle_interval: Duration,
    pub validation: ValidationMode,
    /// Root directory of the local backends.
    pub data_root: PathBuf,
}

impl Config {
    pub fn new(source: SourceConfig, storage: StorageConfig) -> Self {
        Self {
            source,
            storage,
            dead_letter_bucket: None,
            idle_interval: DEFAULT_IDLE_INTERVAL,
            validation: ValidationMode::default(),
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
        }
    }

    /// Startup checks. Any error here should stop the process.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match &self.source {
            SourceConfig::Bucket { bucket } => non_empty("request source", bucket)?,
            SourceConfig::Queue {
                queue_url,
                max_messages,
                wait_time,
            } => {
                non_empty("queue url", queue_url)?;
                if *max_messages == 0 || *max_messages > MAX_RECEIVE_BATCH {
                    return Err(ConfigError::InvalidBatchSize(*max_messages));
                }
                if *wait_time > MAX_WAIT_TIME {
                    return Err(ConfigError::InvalidWaitTime(*wait_time));
                }
            }
        }
        non_empty("request destination", &self.storage.destination)?;
        if let Some(bucket) = &self.dead_letter_bucket {
            non_empty("dead letter bucket", bucket)?;
        }
        self.check_bucket_reuse()
    }

    /// A bucket source lists every key in its bucket, so nothing else may
    /// write there.
    fn check_bucket_reuse(&self) -> Result<(), ConfigError> {
        let SourceConfig::Bucket { bucket } = &self.source else {
            return Ok(());
        };
        let source = bucket.trim();
        if self.dead_letter_bucket.as_deref().map(str::trim) == Some(source) {
            return Err(ConfigError::DeadLetterIsSource(source.to_string()));
        }
        if self.storage.kind == StorageKind::Document && self.storage.destination.trim() == source {
            return Err(ConfigError::DestinationIsSource(source.to_string()));
        }
        Ok(())
    }
}

fn non_empty(what: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty(what));
    }
    Ok(())
}
