//! Observability infrastructure for the interface guard
//!
//! Provides:
//! - Prometheus metrics (tick latency, actions taken, failures, recovery, index size)
//! - Structured JSON logging with tracing

use prometheus::{
    register_histogram, register_int_counter, register_int_gauge, Histogram, IntCounter, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for tick latency (in seconds)
const TICK_LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<GuardMetricsInner> = OnceLock::new();

struct GuardMetricsInner {
    tick_latency_seconds: Histogram,
    ticks: IntCounter,
    disables: IntCounter,
    enables: IntCounter,
    check_errors: IntCounter,
    action_errors: IntCounter,
    persistence_errors: IntCounter,
    recovered_events: IntCounter,
    skipped_log_lines: IntCounter,
    index_events: IntGauge,
    paused: IntGauge,
}

impl GuardMetricsInner {
    fn new() -> Self {
        Self {
            tick_latency_seconds: register_histogram!(
                "ifguard_tick_latency_seconds",
                "Time spent in one check/act/record cycle",
                TICK_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register tick_latency_seconds"),

            ticks: register_int_counter!("ifguard_ticks_total", "Total monitor ticks executed")
                .expect("Failed to register ticks_total"),

            disables: register_int_counter!(
                "ifguard_interface_disables_total",
                "Times the guarded interface was brought down"
            )
            .expect("Failed to register interface_disables_total"),

            enables: register_int_counter!(
                "ifguard_interface_enables_total",
                "Times the guarded interface was brought up"
            )
            .expect("Failed to register interface_enables_total"),

            check_errors: register_int_counter!(
                "ifguard_check_errors_total",
                "Failed interface status queries"
            )
            .expect("Failed to register check_errors_total"),

            action_errors: register_int_counter!(
                "ifguard_action_errors_total",
                "Failed enable/disable invocations"
            )
            .expect("Failed to register action_errors_total"),

            persistence_errors: register_int_counter!(
                "ifguard_persistence_errors_total",
                "Event log appends that failed after a successful action"
            )
            .expect("Failed to register persistence_errors_total"),

            recovered_events: register_int_counter!(
                "ifguard_recovered_events_total",
                "Events replayed from the log at startup"
            )
            .expect("Failed to register recovered_events_total"),

            skipped_log_lines: register_int_counter!(
                "ifguard_skipped_log_lines_total",
                "Malformed log lines dropped during recovery"
            )
            .expect("Failed to register skipped_log_lines_total"),

            index_events: register_int_gauge!(
                "ifguard_index_events",
                "Events held in the in-memory recent index"
            )
            .expect("Failed to register index_events"),

            paused: register_int_gauge!("ifguard_paused", "1 while monitoring is paused")
                .expect("Failed to register paused"),
        }
    }
}

/// Handle to the process-wide guard metrics.
/// Clones share the same underlying Prometheus collectors.
#[derive(Clone)]
pub struct GuardMetrics {
    _private: (),
}

impl Default for GuardMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GuardMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GuardMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GuardMetricsInner {
        GLOBAL_METRICS.get_or_init(GuardMetricsInner::new)
    }

    pub fn observe_tick(&self, duration_secs: f64) {
        self.inner().tick_latency_seconds.observe(duration_secs);
        self.inner().ticks.inc();
    }

    pub fn inc_disables(&self) {
        self.inner().disables.inc();
    }

    pub fn inc_enables(&self) {
        self.inner().enables.inc();
    }

    pub fn inc_check_errors(&self) {
        self.inner().check_errors.inc();
    }

    pub fn inc_action_errors(&self) {
        self.inner().action_errors.inc();
    }

    pub fn inc_persistence_errors(&self) {
        self.inner().persistence_errors.inc();
    }

    pub fn record_recovery(&self, recovered: usize, skipped: usize) {
        self.inner().recovered_events.inc_by(recovered as u64);
        self.inner().skipped_log_lines.inc_by(skipped as u64);
    }

    pub fn set_index_events(&self, count: usize) {
        self.inner().index_events.set(count as i64);
    }

    pub fn set_paused(&self, paused: bool) {
        self.inner().paused.set(i64::from(paused));
    }
}

/// Structured logger for guard events
///
/// One JSON line per domain event, tagged with the guarded interface.
#[derive(Clone)]
pub struct StructuredLogger {
    interface: String,
}

impl StructuredLogger {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
        }
    }

    pub fn log_disabled(&self, reason: &str) {
        info!(
            event = "interface_disabled",
            interface = %self.interface,
            reason = %reason,
            "Interface brought down"
        );
    }

    pub fn log_enabled(&self, reason: &str) {
        info!(
            event = "interface_enabled",
            interface = %self.interface,
            reason = %reason,
            "Interface brought up"
        );
    }

    pub fn log_write_failed(&self, error: &dyn std::error::Error) {
        warn!(
            event = "event_log_write_failed",
            interface = %self.interface,
            error = %error,
            "Failed to persist event, keeping it in memory only"
        );
    }

    pub fn log_recovery(&self, recovered: usize, skipped: usize) {
        if skipped > 0 {
            warn!(
                event = "recovery_complete",
                interface = %self.interface,
                recovered = recovered,
                skipped = skipped,
                "Recovered events from log, some lines were malformed"
            );
        } else {
            info!(
                event = "recovery_complete",
                interface = %self.interface,
                recovered = recovered,
                "Recovered events from log"
            );
        }
    }

    pub fn log_startup(&self, version: &str, polling_interval_ms: u128) {
        info!(
            event = "guard_started",
            interface = %self.interface,
            version = %version,
            polling_interval_ms = polling_interval_ms as u64,
            "Interface guard started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "guard_shutdown",
            interface = %self.interface,
            reason = %reason,
            "Interface guard shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_metrics_handles_share_registry() {
        let metrics = GuardMetrics::new();
        let other = metrics.clone();

        metrics.observe_tick(0.002);
        other.inc_disables();
        other.inc_enables();
        metrics.inc_check_errors();
        metrics.inc_action_errors();
        metrics.inc_persistence_errors();
        metrics.record_recovery(3, 1);
        metrics.set_index_events(3);
        metrics.set_paused(true);

        let families = prometheus::gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "ifguard_interface_disables_total"));
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("awdl0");
        assert_eq!(logger.interface, "awdl0");
        logger.log_recovery(2, 0);
    }
}
