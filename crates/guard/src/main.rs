//! ifguard - keeps a network interface down
//!
//! Polls the configured interface (awdl0 by default), forces it down whenever
//! it comes up and records every action in a daily event log. The interface
//! is brought back up on exit.

use anyhow::{Context, Result};
use guard_lib::{
    api::{self, AppState},
    health::{components, HealthRegistry},
    monitor::{MonitorLoop, MonitorServiceBuilder, TickOutcome},
    network::{has_elevated_privileges, IfconfigNetwork},
    observability::{GuardMetrics, StructuredLogger},
    settings::SettingsStore,
    stats::StatsService,
    store::{recover_into, EventLogStore, RecentEventIndex},
    PollingConfig,
};
use std::sync::{Arc, RwLock};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod config;

const GUARD_VERSION: &str = env!("CARGO_PKG_VERSION");

const OUTCOME_BUFFER_SIZE: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting ifguard");

    let config = config::GuardConfig::load()?;
    info!(interface = %config.interface, "Guard configured");

    let is_root = has_elevated_privileges();
    if !config.allow_unprivileged && !is_root {
        anyhow::bail!(
            "ifguard must run as root to change {} (set IFGUARD_ALLOW_UNPRIVILEGED=true to override)",
            config.interface
        );
    }

    let metrics = GuardMetrics::new();
    let logger = StructuredLogger::new(&config.interface);

    let health_registry = HealthRegistry::new();
    health_registry.register(components::MONITOR).await;
    health_registry.register(components::EVENT_LOG).await;
    health_registry.register(components::NETWORK).await;

    // Event storage, seeded from today's log
    let log_dir = config.log_dir()?;
    let store = Arc::new(
        EventLogStore::new(&log_dir)
            .with_context(|| format!("Failed to open event log at {}", log_dir.display()))?,
    );
    let index = Arc::new(match config.index_retention() {
        Some(retention) => RecentEventIndex::with_retention(retention),
        None => RecentEventIndex::new(),
    });

    match recover_into(&store, &index, chrono::Local::now().date_naive()) {
        Ok(report) => {
            metrics.record_recovery(report.recovered, report.skipped);
            metrics.set_index_events(index.len());
            logger.log_recovery(report.recovered, report.skipped);
        }
        Err(e) => {
            warn!(error = %e, "Failed to recover events from log");
            health_registry
                .set_degraded(components::EVENT_LOG, e.to_string())
                .await;
        }
    }

    // User settings
    let settings = SettingsStore::new(config.settings_path()?);
    let polling_config = settings.load().unwrap_or_else(|e| {
        warn!(error = %format!("{:#}", e), "Ignoring unreadable settings file");
        PollingConfig::default()
    });
    let polling = Arc::new(RwLock::new(polling_config));

    let network = IfconfigNetwork::new().with_privilege_prefix(config.privilege_prefix(is_root));

    let service = Arc::new(
        MonitorServiceBuilder::new()
            .network(Arc::new(network))
            .store(store)
            .index(index.clone())
            .interface(config.interface.clone())
            .metrics(metrics.clone())
            .health(health_registry.clone())
            .build()?,
    );

    let (monitor_loop, handle, outcomes) =
        MonitorLoop::new(service.clone(), polling.clone(), OUTCOME_BUFFER_SIZE);

    let app_state = Arc::new(AppState {
        health_registry: health_registry.clone(),
        metrics: metrics.clone(),
        service: service.clone(),
        stats: StatsService::new(index),
        handle,
        polling: polling.clone(),
        settings: Some(settings),
    });

    health_registry.set_ready(true).await;
    logger.log_startup(GUARD_VERSION, polling_config.interval().as_millis());

    let (shutdown_tx, _) = broadcast::channel(1);

    let loop_handle = tokio::spawn(monitor_loop.run(shutdown_tx.subscribe()));
    let drain_handle = tokio::spawn(drain_outcomes(outcomes));

    let api_addr = config.api_addr();
    let api_health = health_registry.clone();
    tokio::spawn(async move {
        if let Err(e) = api::serve(api_addr, app_state).await {
            error!(error = %format!("{:#}", e), "Status API stopped");
            api_health
                .set_degraded(components::MONITOR, "status API unavailable")
                .await;
        }
    });

    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");

    let _ = shutdown_tx.send(());
    if let Err(e) = loop_handle.await {
        error!(error = %e, "Monitor loop task failed");
    }
    drain_handle.abort();

    if let Err(e) = service.restore_with_timeout(config.restore_timeout()).await {
        error!(error = %e, "Failed to restore interface on exit");
    }

    info!("Shutdown complete");
    Ok(())
}

/// Log each tick result as it arrives
async fn drain_outcomes(mut outcomes: mpsc::Receiver<TickOutcome>) {
    while let Some(outcome) = outcomes.recv().await {
        match (outcome.event, outcome.error) {
            (_, Some(e)) => warn!(error = %e, "Tick failed"),
            (Some(event), None) => debug!(kind = %event.kind, message = %event.message, "Tick acted"),
            (None, None) => {}
        }
    }
}
