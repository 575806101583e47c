//! `/metrics` gauges, kept in their own test binary so the global registry
//! is not shared with other API tests

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Local;
use guard_lib::{
    api::{create_router, AppState},
    health::HealthRegistry,
    monitor::{MonitorLoop, MonitorServiceBuilder},
    network::NetworkControl,
    observability::GuardMetrics,
    stats::StatsService,
    store::{EventLogStore, RecentEventIndex},
    Event, EventKind, InterfaceStatus, PollingConfig,
};
use std::sync::{Arc, RwLock};
use tempfile::TempDir;
use tower::ServiceExt;

struct DownNetwork;

#[async_trait]
impl NetworkControl for DownNetwork {
    async fn check_interface(&self, _name: &str) -> Result<InterfaceStatus> {
        Ok(InterfaceStatus::Down)
    }

    async fn disable_interface(&self, _name: &str) -> Result<()> {
        Ok(())
    }

    async fn enable_interface(&self, _name: &str) -> Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_metrics_reports_current_index_size() {
    let temp_dir = TempDir::new().unwrap();
    let index = Arc::new(RecentEventIndex::new());
    let service = Arc::new(
        MonitorServiceBuilder::new()
            .network(Arc::new(DownNetwork))
            .store(Arc::new(EventLogStore::new(temp_dir.path()).unwrap()))
            .index(index.clone())
            .build()
            .unwrap(),
    );
    let polling = Arc::new(RwLock::new(PollingConfig::default()));
    let (_loop, handle, _outcomes) = MonitorLoop::new(service.clone(), polling.clone(), 1);

    let metrics = GuardMetrics::new();
    metrics.set_index_events(0);
    let state = Arc::new(AppState {
        health_registry: HealthRegistry::new(),
        metrics,
        service,
        stats: StatsService::new(index.clone()),
        handle,
        polling,
        settings: None,
    });

    // Added behind the service's back, so only the handler can update the gauge
    for i in 0..37 {
        index.add(Event::at(
            Local::now(),
            EventKind::Disable,
            format!("event {}", i),
        ));
    }

    let response = create_router(state)
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.lines().any(|line| line == "ifguard_index_events 37"));
}
