//! Observability - ログ初期化と router の集計
//!
//! # 学習ポイント
//! - `init_logging` は `Once` で 1 回だけ subscriber を登録（複数回呼んでも安全）
//! - 集計は `AtomicU64` なので router の外から lock なしで読める

use std::sync::Once;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};
use tracing::Span;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use crate::domain::Operation;

static INIT: Once = Once::new();

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable, for terminals.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Installs the global subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging(format: LogFormat) {
    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        // try_init: a test harness may already have installed one
        let result = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().pretty())
                .try_init(),
        };
        if let Err(e) = result {
            tracing::debug!(error = %e, "global subscriber already set");
        }
    });
}

/// Span wrapping the handling of one delivery.
pub fn delivery_span(token: &str) -> Span {
    tracing::info_span!("delivery", token = token)
}

/// Running totals kept by the router.
#[derive(Debug, Default)]
pub struct RouterStats {
    fetched: AtomicU64,
    rejected: AtomicU64,
    dead_lettered: AtomicU64,
    stored: AtomicU64,
    deleted: AtomicU64,
    ignored: AtomicU64,
    store_failures: AtomicU64,
    ack_failures: AtomicU64,
}

/// Point-in-time copy of [`RouterStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub fetched: u64,
    pub rejected: u64,
    pub dead_lettered: u64,
    pub stored: u64,
    pub deleted: u64,
    pub ignored: u64,
    pub store_failures: u64,
    pub ack_failures: u64,
}

fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

impl RouterStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetched(&self) {
        bump(&self.fetched);
    }

    pub fn record_rejected(&self, parked: bool) {
        bump(&self.rejected);
        if parked {
            bump(&self.dead_lettered);
        }
    }

    /// Counts a storage call that succeeded (or was skipped for `Ignored`).
    pub fn record_operation(&self, operation: Operation) {
        match operation {
            Operation::Created | Operation::Updated => bump(&self.stored),
            Operation::Deleted => bump(&self.deleted),
            Operation::Ignored => bump(&self.ignored),
        }
    }

    pub fn record_store_failure(&self) {
        bump(&self.store_failures);
    }

    pub fn record_ack_failure(&self) {
        bump(&self.ack_failures);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let load = |c: &AtomicU64| c.load(Ordering::Relaxed);
        StatsSnapshot {
            fetched: load(&self.fetched),
            rejected: load(&self.rejected),
            dead_lettered: load(&self.dead_lettered),
            stored: load(&self.stored),
            deleted: load(&self.deleted),
            ignored: load(&self.ignored),
            store_failures: load(&self.store_failures),
            ack_failures: load(&self.ack_failures),
        }
    }
}
