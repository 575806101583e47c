//! Check/act/record operations on the guarded interface

use crate::error::MonitorError;
use crate::health::{components, HealthRegistry};
use crate::models::{Event, EventKind, InterfaceStatus};
use crate::network::NetworkControl;
use crate::observability::{GuardMetrics, StructuredLogger};
use crate::store::{EventLogStore, RecentEventIndex};
use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Interface guarded when none is configured
pub const DEFAULT_INTERFACE: &str = "awdl0";

/// Monitors one interface and forces it down whenever it comes up
pub struct MonitorService {
    network: Arc<dyn NetworkControl>,
    store: Arc<EventLogStore>,
    index: Arc<RecentEventIndex>,
    interface: String,
    metrics: GuardMetrics,
    health: HealthRegistry,
    logger: StructuredLogger,
}

impl MonitorService {
    pub fn interface(&self) -> &str {
        &self.interface
    }

    pub fn index(&self) -> &Arc<RecentEventIndex> {
        &self.index
    }

    pub fn store(&self) -> &Arc<EventLogStore> {
        &self.store
    }

    /// Run one check/decide/act/record cycle.
    ///
    /// Returns `Ok(None)` when the interface is not up. A `Disable` event is
    /// returned only after the interface was successfully brought down.
    pub async fn tick(&self) -> Result<Option<Event>, MonitorError> {
        let start = Instant::now();
        let result = self.run_tick().await;
        self.metrics.observe_tick(start.elapsed().as_secs_f64());
        result
    }

    async fn run_tick(&self) -> Result<Option<Event>, MonitorError> {
        let status = self.check().await?;
        if status != InterfaceStatus::Up {
            return Ok(None);
        }

        self.set_enabled(false).await?;

        let event = Event::new(
            EventKind::Disable,
            format!("{} detected UP. Disabling...", self.interface),
        );
        self.logger.log_disabled("detected up");
        self.record(event.clone()).await;

        Ok(Some(event))
    }

    /// Flip the interface: bring it down if it is up, up otherwise
    pub async fn toggle_interface(&self) -> Result<Option<Event>, MonitorError> {
        let status = self.check().await?;

        let event = if status == InterfaceStatus::Up {
            self.set_enabled(false).await?;
            self.logger.log_disabled("manual toggle");
            Event::new(
                EventKind::Disable,
                format!("{} manually disabled", self.interface),
            )
        } else {
            self.set_enabled(true).await?;
            self.logger.log_enabled("manual toggle");
            Event::new(
                EventKind::Enable,
                format!("{} manually enabled", self.interface),
            )
        };

        self.record(event.clone()).await;
        Ok(Some(event))
    }

    /// Bring the interface back up. Called once on shutdown.
    pub async fn restore(&self) -> Result<(), MonitorError> {
        self.set_enabled(true).await?;
        self.logger.log_enabled("restore on exit");
        Ok(())
    }

    /// [`restore`](Self::restore), giving up after `limit`
    pub async fn restore_with_timeout(&self, limit: Duration) -> Result<(), MonitorError> {
        match tokio::time::timeout(limit, self.restore()).await {
            Ok(result) => result,
            Err(_) => Err(MonitorError::Timeout {
                interface: self.interface.clone(),
                operation: "restore",
                elapsed: limit,
            }),
        }
    }

    async fn check(&self) -> Result<InterfaceStatus, MonitorError> {
        match self.network.check_interface(&self.interface).await {
            Ok(status) => {
                debug!(interface = %self.interface, status = %status, "Checked interface");
                self.health.report(components::NETWORK, None).await;
                Ok(status)
            }
            Err(source) => {
                self.metrics.inc_check_errors();
                self.health
                    .report(components::NETWORK, Some(format!("{:#}", source)))
                    .await;
                Err(MonitorError::Query {
                    interface: self.interface.clone(),
                    source,
                })
            }
        }
    }

    async fn set_enabled(&self, enabled: bool) -> Result<(), MonitorError> {
        let (action, result) = if enabled {
            ("enable", self.network.enable_interface(&self.interface).await)
        } else {
            ("disable", self.network.disable_interface(&self.interface).await)
        };

        match result {
            Ok(()) => {
                if enabled {
                    self.metrics.inc_enables();
                } else {
                    self.metrics.inc_disables();
                }
                self.health.report(components::MONITOR, None).await;
                Ok(())
            }
            Err(source) => {
                self.metrics.inc_action_errors();
                self.health
                    .report(components::MONITOR, Some(format!("{:#}", source)))
                    .await;
                Err(MonitorError::Action {
                    interface: self.interface.clone(),
                    action,
                    source,
                })
            }
        }
    }

    /// Persist to the log (best effort) and add to the index (always)
    async fn record(&self, event: Event) {
        match self.store.append(&event) {
            Ok(()) => self.health.report(components::EVENT_LOG, None).await,
            Err(e) => {
                self.metrics.inc_persistence_errors();
                self.logger.log_write_failed(&e);
                self.health
                    .report(components::EVENT_LOG, Some(e.to_string()))
                    .await;
            }
        }

        self.index.add(event);
        self.metrics.set_index_events(self.index.len());
    }
}

/// Builder for [`MonitorService`]
pub struct MonitorServiceBuilder {
    network: Option<Arc<dyn NetworkControl>>,
    store: Option<Arc<EventLogStore>>,
    index: Option<Arc<RecentEventIndex>>,
    interface: String,
    metrics: Option<GuardMetrics>,
    health: Option<HealthRegistry>,
}

impl MonitorServiceBuilder {
    pub fn new() -> Self {
        Self {
            network: None,
            store: None,
            index: None,
            interface: DEFAULT_INTERFACE.to_string(),
            metrics: None,
            health: None,
        }
    }

    pub fn network(mut self, network: Arc<dyn NetworkControl>) -> Self {
        self.network = Some(network);
        self
    }

    pub fn store(mut self, store: Arc<EventLogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn index(mut self, index: Arc<RecentEventIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = interface.into();
        self
    }

    pub fn metrics(mut self, metrics: GuardMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn health(mut self, health: HealthRegistry) -> Self {
        self.health = Some(health);
        self
    }

    pub fn build(self) -> Result<MonitorService> {
        let network = self
            .network
            .ok_or_else(|| anyhow::anyhow!("Network control is required"))?;
        let store = self
            .store
            .ok_or_else(|| anyhow::anyhow!("Event log store is required"))?;
        let index = self
            .index
            .ok_or_else(|| anyhow::anyhow!("Recent event index is required"))?;
        if self.interface.trim().is_empty() {
            anyhow::bail!("Interface name must not be empty");
        }

        Ok(MonitorService {
            network,
            store,
            index,
            logger: StructuredLogger::new(&self.interface),
            interface: self.interface,
            metrics: self.metrics.unwrap_or_default(),
            health: self.health.unwrap_or_default(),
        })
    }
}

impl Default for MonitorServiceBuilder {
    fn default() -> Self {
        Self::new()
    }
}
