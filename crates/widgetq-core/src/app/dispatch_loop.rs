//! DispatchLoop - source から取り出して router に渡し続けるループ
//!
//! # 学習ポイント
//! - shutdown は `watch` channel で伝える（sender を drop しても止まる）
//! - fetch（long-poll で待つ可能性がある）だけを shutdown と select で競合させる
//! - 取り出した batch は最後まで route する。途中で止めると ack 前の作業が無駄になる

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::router::Router;
use crate::domain::RouteOutcome;
use crate::ports::Delivery;

pub const DEFAULT_IDLE_INTERVAL: Duration = Duration::from_millis(100);

/// Result of one iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// The source had nothing (or failed); the loop should sleep.
    Idle,
    /// Outcomes in delivery order.
    Routed(Vec<RouteOutcome>),
}

pub struct DispatchLoop {
    router: Arc<Router>,
    idle_interval: Duration,
}

impl DispatchLoop {
    pub fn new(router: Arc<Router>) -> Self {
        Self {
            router,
            idle_interval: DEFAULT_IDLE_INTERVAL,
        }
    }

    pub fn with_idle_interval(mut self, idle_interval: Duration) -> Self {
        self.idle_interval = idle_interval;
        self
    }

    pub fn router(&self) -> &Arc<Router> {
        &self.router
    }

    /// One fetch and every resulting route. Does not sleep.
    pub async fn tick(&self) -> Tick {
        let deliveries = self.fetch().await;
        if deliveries.is_empty() {
            return Tick::Idle;
        }
        Tick::Routed(self.route_all(deliveries).await)
    }

    /// Runs until `shutdown_rx` sees `true` or its sender goes away.
    ///
    /// Each iteration does what [`tick`](Self::tick) does, except that the
    /// fetch and the idle sleep are raced against shutdown. Routing a fetched
    /// batch is never interrupted.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(
            source = %self.router.source().describe(),
            destination = %self.router.store().describe(),
            idle_ms = self.idle_interval.as_millis() as u64,
            "dispatch loop started"
        );
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let deliveries = tokio::select! {
                changed = shutdown_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
                deliveries = self.fetch() => deliveries,
            };

            if deliveries.is_empty() {
                tokio::select! {
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(self.idle_interval) => {}
                }
                continue;
            }

            self.route_all(deliveries).await;
        }
        tracing::info!("dispatch loop stopped");
    }

    /// Moves the loop onto a tokio task.
    pub fn spawn(self) -> DispatchHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });
        DispatchHandle { shutdown_tx, join }
    }

    async fn fetch(&self) -> Vec<Delivery> {
        match self.router.source().fetch().await {
            Ok(deliveries) => deliveries,
            Err(e) => {
                tracing::warn!(
                    source = %self.router.source().describe(),
                    error = %e,
                    "fetch failed; treating as no work"
                );
                Vec::new()
            }
        }
    }

    async fn route_all(&self, deliveries: Vec<Delivery>) -> Vec<RouteOutcome> {
        let mut outcomes = Vec::with_capacity(deliveries.len());
        for delivery in &deliveries {
            outcomes.push(self.router.route(delivery).await);
        }
        outcomes
    }
}

/// Handle to a spawned [`DispatchLoop`].
pub struct DispatchHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl DispatchHandle {
    /// Stops fetching new work. The current batch still finishes.
    pub fn request_shutdown(&self) {
        // receiver may already be gone
        let _ = self.shutdown_tx.send(true);
    }

    pub async fn shutdown_and_join(self) {
        self.request_shutdown();
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "dispatch task ended abnormally");
        }
    }
}
