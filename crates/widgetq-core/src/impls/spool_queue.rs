//! SpoolQueue - ディレクトリを使ったローカル配送キュー
//!
//! 別プロセス（`widgetq submit` と `widgetq run`）の間で request を受け渡すための実装です。
//!
//! # レイアウト
//! - `{root}/queues/{name}/ready/{message_id}.msg` : 受信可能
//! - `{root}/queues/{name}/inflight/{message_id}~{receipt}~{deadline_ms}` : 受信済み・未 ack
//!
//! `{name}` は queue URL の最後のパスセグメントです。
//! message id は SpoolQueue ごとに単調増加する ULID なので、1 つの送信側から見た
//! ファイル名順は送信順です。別プロセスの送信が同じミリ秒に重なったときの前後は保証しません。
//! 受信は rename による claim なので、複数プロセスが同じ spool を読んでも
//! 1 つのメッセージを同時に受け取るのは 1 プロセスだけです。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use super::inmem_queue::{DEFAULT_VISIBILITY_TIMEOUT, hidden_until};
use crate::ports::message_queue::check_batch_size;
use crate::ports::{
    Clock, IdGenerator, MessageQueue, QueueError, ReceivedMessage, SystemClock, UlidGenerator,
};

const READY_DIR: &str = "ready";
const INFLIGHT_DIR: &str = "inflight";
const MESSAGE_EXT: &str = ".msg";
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(250);

pub struct SpoolQueue {
    root: PathBuf,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
    visibility_timeout: Duration,
    poll_interval: Duration,
}

struct SpoolDirs {
    base: PathBuf,
    ready: PathBuf,
    inflight: PathBuf,
}

/// Parsed in-flight file name.
struct InFlight {
    message_id: String,
    receipt: String,
    deadline_ms: i64,
}

impl InFlight {
    fn parse(name: &str) -> Option<Self> {
        let mut parts = name.splitn(3, '~');
        let message_id = parts.next()?.to_string();
        let receipt = parts.next()?.to_string();
        let deadline_ms = parts.next()?.parse().ok()?;
        Some(Self {
            message_id,
            receipt,
            deadline_ms,
        })
    }

    fn file_name(&self) -> String {
        format!("{}~{}~{}", self.message_id, self.receipt, self.deadline_ms)
    }
}

/// Queue name for a URL: its last non-empty path segment.
pub fn queue_name(queue_url: &str) -> Result<String, QueueError> {
    let without_query = queue_url.split(['?', '#']).next().unwrap_or_default();
    let name = without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();
    let ok = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if !ok {
        return Err(QueueError::InvalidQueueUrl(queue_url.to_string()));
    }
    Ok(name.to_string())
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> QueueError + '_ {
    move |source| QueueError::Io {
        path: path.display().to_string(),
        source,
    }
}

async fn file_names(dir: &Path) -> Result<Vec<String>, QueueError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(io_error(dir)(e)),
    };
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error(dir))? {
        names.push(entry.file_name().to_string_lossy().into_owned());
    }
    names.sort();
    Ok(names)
}

impl SpoolQueue {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_clock(root, Arc::new(SystemClock), DEFAULT_VISIBILITY_TIMEOUT)
    }

    pub fn with_clock(
        root: impl Into<PathBuf>,
        clock: Arc<dyn Clock>,
        visibility_timeout: Duration,
    ) -> Self {
        Self {
            root: root.into(),
            ids: Box::new(UlidGenerator::new(Arc::clone(&clock))),
            clock,
            visibility_timeout,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    async fn dirs(&self, queue_url: &str) -> Result<SpoolDirs, QueueError> {
        let base = self.root.join("queues").join(queue_name(queue_url)?);
        let dirs = SpoolDirs {
            ready: base.join(READY_DIR),
            inflight: base.join(INFLIGHT_DIR),
            base,
        };
        for dir in [&dirs.ready, &dirs.inflight] {
            tokio::fs::create_dir_all(dir).await.map_err(io_error(dir))?;
        }
        Ok(dirs)
    }

    /// Moves expired in-flight messages back to ready.
    async fn reclaim_expired(&self, dirs: &SpoolDirs) -> Result<(), QueueError> {
        let now_ms = self.clock.now().timestamp_millis();
        for name in file_names(&dirs.inflight).await? {
            let Some(inflight) = InFlight::parse(&name) else {
                continue;
            };
            if inflight.deadline_ms > now_ms {
                continue;
            }
            let from = dirs.inflight.join(&name);
            let to = dirs
                .ready
                .join(format!("{}{MESSAGE_EXT}", inflight.message_id));
            match tokio::fs::rename(&from, &to).await {
                Ok(()) => {
                    tracing::debug!(message_id = %inflight.message_id, "visibility timeout expired");
                }
                // another consumer got there first
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(io_error(&from)(e)),
            }
        }
        Ok(())
    }

    async fn claim(&self, dirs: &SpoolDirs, max: usize) -> Result<Vec<ReceivedMessage>, QueueError> {
        self.reclaim_expired(dirs).await?;

        let deadline_ms = hidden_until(self.clock.now(), self.visibility_timeout).timestamp_millis();
        let mut received = Vec::new();
        for name in file_names(&dirs.ready).await? {
            if received.len() >= max {
                break;
            }
            let Some(message_id) = name.strip_suffix(MESSAGE_EXT) else {
                continue;
            };
            let inflight = InFlight {
                message_id: message_id.to_string(),
                receipt: self.ids.receipt_handle().to_string(),
                deadline_ms,
            };
            let from = dirs.ready.join(&name);
            let to = dirs.inflight.join(inflight.file_name());
            match tokio::fs::rename(&from, &to).await {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(io_error(&from)(e)),
            }
            let body = tokio::fs::read_to_string(&to).await.map_err(io_error(&to))?;
            received.push(ReceivedMessage {
                message_id: inflight.message_id,
                receipt_handle: inflight.receipt,
                body,
            });
        }
        Ok(received)
    }
}

#[async_trait]
impl MessageQueue for SpoolQueue {
    async fn send_message(&self, queue_url: &str, body: String) -> Result<String, QueueError> {
        let dirs = self.dirs(queue_url).await?;
        let message_id = self.ids.message_id().to_string();
        let tmp = dirs.base.join(format!(".{message_id}.tmp"));
        let path = dirs.ready.join(format!("{message_id}{MESSAGE_EXT}"));
        tokio::fs::write(&tmp, body).await.map_err(io_error(&tmp))?;
        tokio::fs::rename(&tmp, &path).await.map_err(io_error(&path))?;
        Ok(message_id)
    }

    async fn receive_messages(
        &self,
        queue_url: &str,
        max_messages: usize,
        wait: Duration,
    ) -> Result<Vec<ReceivedMessage>, QueueError> {
        check_batch_size(max_messages)?;
        let dirs = self.dirs(queue_url).await?;
        let deadline = Instant::now() + wait;
        loop {
            let received = self.claim(&dirs, max_messages).await?;
            if !received.is_empty() {
                return Ok(received);
            }
            let now = Instant::now();
            if now >= deadline {
                return Ok(Vec::new());
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn delete_message(
        &self,
        queue_url: &str,
        receipt_handle: &str,
    ) -> Result<(), QueueError> {
        if receipt_handle.is_empty() || receipt_handle.contains(['~', '/', '\\']) {
            return Err(QueueError::InvalidReceipt(receipt_handle.to_string()));
        }
        let dirs = self.dirs(queue_url).await?;
        for name in file_names(&dirs.inflight).await? {
            let Some(inflight) = InFlight::parse(&name) else {
                continue;
            };
            if inflight.receipt != receipt_handle {
                continue;
            }
            let path = dirs.inflight.join(&name);
            return match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    Err(QueueError::InvalidReceipt(receipt_handle.to_string()))
                }
                Err(e) => Err(io_error(&path)(e)),
            };
        }
        Err(QueueError::InvalidReceipt(receipt_handle.to_string()))
    }
}
