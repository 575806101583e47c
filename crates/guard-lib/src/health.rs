//! Component health for the status API
//!
//! The monitor, the event log and the network capability each report here.
//! A single failure degrades a component; [`UNHEALTHY_AFTER`] failures in a
//! row make it unhealthy, which fails `/healthz` and `/readyz`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Consecutive failures before a degraded component turns unhealthy
pub const UNHEALTHY_AFTER: u32 = 5;

/// Health status of a component, ordered from best to worst
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Healthy,
    /// Failing, but the guard keeps working around it
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub consecutive_failures: u32,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            consecutive_failures: 0,
            last_check_timestamp: chrono::Local::now().timestamp(),
        }
    }

    /// The state after one more failure on top of `previous`
    fn after_failure(previous: Option<&ComponentHealth>, message: String) -> Self {
        let consecutive_failures = previous.map_or(0, |p| p.consecutive_failures) + 1;
        let status = if consecutive_failures >= UNHEALTHY_AFTER {
            ComponentStatus::Unhealthy
        } else {
            ComponentStatus::Degraded
        };

        Self {
            status,
            message: Some(message),
            consecutive_failures,
            last_check_timestamp: chrono::Local::now().timestamp(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: ComponentStatus,
    pub components: HashMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Component names for health tracking
pub mod components {
    pub const MONITOR: &str = "monitor";
    pub const EVENT_LOG: &str = "event_log";
    pub const NETWORK: &str = "network";
}

#[derive(Debug, Default)]
struct RegistryState {
    components: HashMap<String, ComponentHealth>,
    ready: bool,
}

impl RegistryState {
    fn overall(&self) -> ComponentStatus {
        self.components
            .values()
            .map(|c| c.status)
            .max()
            .unwrap_or(ComponentStatus::Healthy)
    }
}

/// Shared registry of component health. Clones see the same state.
#[derive(Debug, Clone, Default)]
pub struct HealthRegistry {
    state: Arc<RwLock<RegistryState>>,
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a component as healthy
    pub async fn register(&self, name: &str) {
        self.state
            .write()
            .await
            .components
            .insert(name.to_string(), ComponentHealth::healthy());
    }

    /// Record the result of an operation: `None` on success, the failure reason otherwise
    pub async fn report(&self, name: &str, failure: Option<String>) {
        let mut state = self.state.write().await;
        let health = match failure {
            None => ComponentHealth::healthy(),
            Some(reason) => ComponentHealth::after_failure(state.components.get(name), reason),
        };
        state.components.insert(name.to_string(), health);
    }

    /// Mark a component degraded without counting towards [`UNHEALTHY_AFTER`]
    pub async fn set_degraded(&self, name: &str, message: impl Into<String>) {
        let mut state = self.state.write().await;
        let consecutive_failures = state
            .components
            .get(name)
            .map_or(0, |c| c.consecutive_failures);
        state.components.insert(
            name.to_string(),
            ComponentHealth {
                status: ComponentStatus::Degraded,
                message: Some(message.into()),
                consecutive_failures,
                last_check_timestamp: chrono::Local::now().timestamp(),
            },
        );
    }

    /// Set once startup recovery has finished
    pub async fn set_ready(&self, ready: bool) {
        self.state.write().await.ready = ready;
    }

    pub async fn health(&self) -> HealthResponse {
        let state = self.state.read().await;
        HealthResponse {
            status: state.overall(),
            components: state.components.clone(),
        }
    }

    pub async fn readiness(&self) -> ReadinessResponse {
        let state = self.state.read().await;
        let reason = if !state.ready {
            Some("Guard not yet initialized")
        } else if state.overall() == ComponentStatus::Unhealthy {
            Some("Critical component unhealthy")
        } else {
            None
        };

        ReadinessResponse {
            ready: reason.is_none(),
            reason: reason.map(str::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_registry_is_healthy_but_not_ready() {
        let registry = HealthRegistry::new();

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Healthy);
        assert!(health.components.is_empty());

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Guard not yet initialized"));
    }

    #[tokio::test]
    async fn test_single_failure_degrades_and_success_recovers() {
        let registry = HealthRegistry::new();
        registry.register(components::MONITOR).await;
        registry.register(components::EVENT_LOG).await;

        registry
            .report(components::EVENT_LOG, Some("Permission denied".to_string()))
            .await;

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        let event_log = &health.components[components::EVENT_LOG];
        assert_eq!(event_log.message.as_deref(), Some("Permission denied"));
        assert_eq!(event_log.consecutive_failures, 1);

        registry.report(components::EVENT_LOG, None).await;
        assert_eq!(registry.health().await.status, ComponentStatus::Healthy);
    }

    #[tokio::test]
    async fn test_repeated_failures_become_unhealthy() {
        let registry = HealthRegistry::new();
        registry.register(components::NETWORK).await;
        registry.set_ready(true).await;

        for _ in 0..UNHEALTHY_AFTER - 1 {
            registry
                .report(components::NETWORK, Some("ifconfig missing".to_string()))
                .await;
        }
        assert_eq!(registry.health().await.status, ComponentStatus::Degraded);
        assert!(registry.readiness().await.ready);

        registry
            .report(components::NETWORK, Some("ifconfig missing".to_string()))
            .await;
        assert_eq!(registry.health().await.status, ComponentStatus::Unhealthy);

        let readiness = registry.readiness().await;
        assert!(!readiness.ready);
        assert_eq!(readiness.reason.as_deref(), Some("Critical component unhealthy"));
    }

    #[tokio::test]
    async fn test_set_degraded_does_not_escalate() {
        let registry = HealthRegistry::new();
        registry.register(components::MONITOR).await;

        for _ in 0..UNHEALTHY_AFTER * 2 {
            registry
                .set_degraded(components::MONITOR, "status API unavailable")
                .await;
        }

        let health = registry.health().await;
        assert_eq!(health.status, ComponentStatus::Degraded);
        assert_eq!(health.components[components::MONITOR].consecutive_failures, 0);
    }
}
