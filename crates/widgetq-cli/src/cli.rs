use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use widgetq_core::config::{
    Config, ConfigError, DEFAULT_DATA_ROOT, SourceConfig, StorageConfig, StorageKind,
};
use widgetq_core::domain::ValidationMode;
use widgetq_core::observability::LogFormat;

#[derive(Parser)]
#[command(
    name = "widgetq",
    about = "Widget request consumer: validates requests and stores widgets",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log output format
    #[arg(long, global = true, env = "WIDGETQ_LOG_FORMAT", value_enum, default_value_t = LogFormatArg::Pretty)]
    pub log_format: LogFormatArg,

    /// Root directory of the local buckets, tables and queues
    #[arg(long, global = true, env = "WIDGETQ_DATA_ROOT", default_value = DEFAULT_DATA_ROOT)]
    pub data_root: PathBuf,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum LogFormatArg {
    Pretty,
    Json,
}

impl From<LogFormatArg> for LogFormat {
    fn from(arg: LogFormatArg) -> Self {
        match arg {
            LogFormatArg::Pretty => LogFormat::Pretty,
            LogFormatArg::Json => LogFormat::Json,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum ValidationArg {
    /// Every rule
    Strict,
    /// Object, type, owner and widgetId only
    Minimal,
}

impl From<ValidationArg> for ValidationMode {
    fn from(arg: ValidationArg) -> Self {
        match arg {
            ValidationArg::Strict => ValidationMode::Strict,
            ValidationArg::Minimal => ValidationMode::Minimal,
        }
    }
}

#[derive(Subcommand)]
pub enum Command {
    /// Consume requests until interrupted
    Run(RunArgs),
    /// Validate a request and put it on a queue
    Submit(SubmitArgs),
}

#[derive(Args)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Bucket holding pending request objects
    #[arg(long = "request-source", env = "WIDGETQ_REQUEST_SOURCE")]
    pub request_source: Option<String>,

    /// Queue delivering pending requests
    #[arg(long = "queue-url", env = "WIDGETQ_QUEUE_URL")]
    pub queue_url: Option<String>,
}

#[derive(Args)]
pub struct RunArgs {
    /// Storage backend (document | key-value; s3 and dynamodb also accepted)
    #[arg(long, env = "WIDGETQ_STORAGE_STRATEGY")]
    pub storage_strategy: StorageKind,

    /// Bucket (document) or table (key-value) receiving widgets
    #[arg(long, env = "WIDGETQ_REQUEST_DESTINATION")]
    pub request_destination: String,

    #[command(flatten)]
    pub source: SourceArgs,

    /// Largest receive batch for a queue source
    #[arg(long, env = "WIDGETQ_MAX_MESSAGES", default_value_t = 10)]
    pub max_messages: usize,

    /// Long-poll wait in seconds for a queue source
    #[arg(long, env = "WIDGETQ_WAIT_TIME", default_value_t = 20)]
    pub wait_time: u64,

    /// Sleep in milliseconds after an empty fetch
    #[arg(long, env = "WIDGETQ_IDLE_MS", default_value_t = 100)]
    pub idle_ms: u64,

    /// Bucket for rejected requests; without it they stay at the source
    #[arg(long, env = "WIDGETQ_DEAD_LETTER_BUCKET")]
    pub dead_letter_bucket: Option<String>,

    #[arg(long, env = "WIDGETQ_VALIDATION", value_enum, default_value_t = ValidationArg::Strict)]
    pub validation: ValidationArg,
}

impl RunArgs {
    pub fn to_config(&self, data_root: &Path) -> Result<Config, ConfigError> {
        let source = SourceConfig::select(
            self.source.request_source.clone(),
            self.source.queue_url.clone(),
            self.max_messages,
            Duration::from_secs(self.wait_time),
        )?;
        let storage = StorageConfig {
            kind: self.storage_strategy,
            destination: self.request_destination.clone(),
        };
        let mut config = Config::new(source, storage);
        config.dead_letter_bucket = self.dead_letter_bucket.clone();
        config.idle_interval = Duration::from_millis(self.idle_ms);
        config.validation = self.validation.into();
        config.data_root = data_root.to_path_buf();
        config.validate()?;
        Ok(config)
    }
}

#[derive(Args)]
pub struct SubmitArgs {
    /// Queue to put the request on
    #[arg(long = "queue-url", env = "WIDGETQ_QUEUE_URL")]
    pub queue_url: String,

    /// JSON file with the request; stdin when omitted
    pub file: Option<PathBuf>,
}
