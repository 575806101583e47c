//! Polling loop
//!
//! Sleeps for the configured polling interval, then runs one tick on a
//! spawned task and reports the outcome over a channel. The interval is read
//! again before every sleep, so edits take effect on the next cycle. Ticks are
//! not coalesced: a slow tick may still be running when the next one starts.
//!
//! Tick tasks are tracked, and [`MonitorLoop::run`] only returns once every
//! in-flight tick has finished (or [`TICK_DRAIN_TIMEOUT`] has passed), so a
//! late disable cannot land after the interface is restored.

use super::MonitorService;
use crate::error::MonitorError;
use crate::models::{Event, SharedPollingConfig};
use crate::observability::GuardMetrics;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// Longest [`MonitorLoop::run`] waits for in-flight ticks after shutdown
pub const TICK_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Whether the loop runs ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Monitoring,
    Paused,
}

/// Result of one spawned tick
#[derive(Debug)]
pub struct TickOutcome {
    pub event: Option<Event>,
    pub error: Option<MonitorError>,
}

impl From<Result<Option<Event>, MonitorError>> for TickOutcome {
    fn from(result: Result<Option<Event>, MonitorError>) -> Self {
        match result {
            Ok(event) => Self { event, error: None },
            Err(error) => Self {
                event: None,
                error: Some(error),
            },
        }
    }
}

/// Pause/resume control for a running [`MonitorLoop`]
#[derive(Clone)]
pub struct MonitorHandle {
    state_tx: Arc<watch::Sender<MonitorState>>,
    metrics: GuardMetrics,
}

impl MonitorHandle {
    pub fn state(&self) -> MonitorState {
        *self.state_tx.borrow()
    }

    pub fn pause(&self) {
        self.set(MonitorState::Paused);
    }

    pub fn resume(&self) {
        self.set(MonitorState::Monitoring);
    }

    /// Switch between monitoring and paused, returning the new state
    pub fn toggle(&self) -> MonitorState {
        let next = match self.state() {
            MonitorState::Monitoring => MonitorState::Paused,
            MonitorState::Paused => MonitorState::Monitoring,
        };
        self.set(next);
        next
    }

    fn set(&self, state: MonitorState) {
        self.state_tx.send_replace(state);
        self.metrics.set_paused(state == MonitorState::Paused);
        info!(state = ?state, "Monitor state changed");
    }
}

/// Drives [`MonitorService::tick`] on the polling interval
pub struct MonitorLoop {
    service: Arc<MonitorService>,
    polling: SharedPollingConfig,
    state_rx: watch::Receiver<MonitorState>,
    outcome_tx: mpsc::Sender<TickOutcome>,
    ticks: JoinSet<()>,
}

impl MonitorLoop {
    /// Create a loop in the `Monitoring` state
    pub fn new(
        service: Arc<MonitorService>,
        polling: SharedPollingConfig,
        buffer_size: usize,
    ) -> (Self, MonitorHandle, mpsc::Receiver<TickOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(buffer_size.max(1));
        let (state_tx, state_rx) = watch::channel(MonitorState::Monitoring);

        let handle = MonitorHandle {
            state_tx: Arc::new(state_tx),
            metrics: GuardMetrics::new(),
        };
        let monitor_loop = Self {
            service,
            polling,
            state_rx,
            outcome_tx,
            ticks: JoinSet::new(),
        };

        (monitor_loop, handle, outcome_rx)
    }

    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        info!(
            interface = %self.service.interface(),
            interval_ms = self.current_interval().as_millis() as u64,
            "Starting monitor loop"
        );

        loop {
            if self.is_paused() {
                tokio::select! {
                    changed = self.state_rx.changed() => {
                        if changed.is_err() {
                            // Nobody can resume us any more
                            let _ = shutdown.recv().await;
                            break;
                        }
                        continue;
                    }
                    _ = shutdown.recv() => break,
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.current_interval()) => {
                    if !self.is_paused() {
                        self.spawn_tick();
                    }
                }
                _ = shutdown.recv() => break,
            }
        }

        info!(in_flight = self.ticks.len(), "Shutting down monitor loop");
        self.drain_ticks().await;
    }

    /// Wait for in-flight ticks, aborting any still running after [`TICK_DRAIN_TIMEOUT`]
    async fn drain_ticks(&mut self) {
        let ticks = &mut self.ticks;
        let drained = tokio::time::timeout(TICK_DRAIN_TIMEOUT, async {
            while let Some(result) = ticks.join_next().await {
                log_tick_join(result);
            }
        })
        .await;

        if drained.is_err() {
            warn!(
                in_flight = self.ticks.len(),
                "Ticks still running at shutdown, aborting them"
            );
            self.ticks.shutdown().await;
        }
    }

    fn reap_finished_ticks(&mut self) {
        while let Some(result) = self.ticks.try_join_next() {
            log_tick_join(result);
        }
    }

    fn is_paused(&self) -> bool {
        *self.state_rx.borrow() == MonitorState::Paused
    }

    fn current_interval(&self) -> Duration {
        self.polling
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .interval()
    }

    fn spawn_tick(&mut self) {
        self.reap_finished_ticks();

        let service = self.service.clone();
        let outcome_tx = self.outcome_tx.clone();

        self.ticks.spawn(async move {
            let outcome = TickOutcome::from(service.tick().await);
            if outcome_tx.send(outcome).await.is_err() {
                debug!("Tick outcome receiver dropped");
            }
        });
    }
}

fn log_tick_join(result: Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        warn!(error = %e, "Tick task failed");
    }
}
