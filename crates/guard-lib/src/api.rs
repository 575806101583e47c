//! Local HTTP status surface
//!
//! Exposes health, Prometheus metrics, the recent event log, the activity
//! histogram and the user controls (toggle interface, pause, polling
//! interval). Meant to be bound to loopback.

use crate::health::{ComponentStatus, HealthRegistry};
use crate::models::{Bucket, Event, SharedPollingConfig};
use crate::monitor::{MonitorHandle, MonitorService, MonitorState};
use crate::observability::GuardMetrics;
use crate::settings::SettingsStore;
use crate::stats::StatsService;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Most recent events returned by `/events`
pub const MAX_LOG_EVENTS: usize = 100;

const DEFAULT_EVENTS_WINDOW_SECS: u64 = 24 * 60 * 60;
const DEFAULT_HISTOGRAM_WINDOW_SECS: u64 = 60 * 60;
const DEFAULT_HISTOGRAM_BUCKETS: usize = 60;
const MAX_HISTOGRAM_BUCKETS: usize = 1440;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub health_registry: HealthRegistry,
    pub metrics: GuardMetrics,
    pub service: Arc<MonitorService>,
    pub stats: StatsService,
    pub handle: MonitorHandle,
    pub polling: SharedPollingConfig,
    pub settings: Option<SettingsStore>,
}

#[derive(Debug, Deserialize)]
pub struct EventsQuery {
    pub window_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct HistogramQuery {
    pub window_secs: Option<u64>,
    pub buckets: Option<usize>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HistogramResponse {
    pub window_secs: u64,
    pub bucket_width_ms: u64,
    pub buckets: Vec<Bucket>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct StateResponse {
    pub interface: String,
    pub state: MonitorState,
    pub polling_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct IntervalRequest {
    pub delta_ms: Option<i64>,
    pub interval_ms: Option<u64>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

fn error_response(status: StatusCode, error: impl ToString) -> Response {
    (
        status,
        Json(ErrorBody {
            error: error.to_string(),
        }),
    )
        .into_response()
}

fn state_response(state: &AppState) -> StateResponse {
    let interval = state
        .polling
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .interval();

    StateResponse {
        interface: state.service.interface().to_string(),
        state: state.handle.state(),
        polling_interval_ms: interval.as_millis() as u64,
    }
}

/// Health check response - returns 200 if healthy, 503 if unhealthy
async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let health = state.health_registry.health().await;

    let status_code = match health.status {
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        ComponentStatus::Healthy | ComponentStatus::Degraded => StatusCode::OK,
    };

    (status_code, Json(health))
}

/// Readiness check response - returns 200 once recovery has finished
async fn readyz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let readiness = state.health_registry.readiness().await;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(readiness))
}

/// Prometheus text exposition, with the index gauge refreshed first
async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state
        .metrics
        .set_index_events(state.service.index().len());

    let encoder = TextEncoder::new();
    let mut buffer = Vec::new();

    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, e);
    }

    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    )
        .into_response()
}

/// The newest events within the window, oldest first
async fn events(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<Event>> {
    let window = Duration::from_secs(query.window_secs.unwrap_or(DEFAULT_EVENTS_WINDOW_SECS));
    let mut events = state.stats.recent_events(window);

    if events.len() > MAX_LOG_EVENTS {
        events.drain(..events.len() - MAX_LOG_EVENTS);
    }

    Json(events)
}

async fn histogram(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistogramQuery>,
) -> Json<HistogramResponse> {
    let window_secs = query.window_secs.unwrap_or(DEFAULT_HISTOGRAM_WINDOW_SECS);
    let bucket_count = query
        .buckets
        .unwrap_or(DEFAULT_HISTOGRAM_BUCKETS)
        .clamp(1, MAX_HISTOGRAM_BUCKETS);
    let window = Duration::from_secs(window_secs);

    Json(HistogramResponse {
        window_secs,
        bucket_width_ms: (window / bucket_count as u32).as_millis() as u64,
        buckets: state.stats.histogram(window, bucket_count),
    })
}

async fn current_state(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    Json(state_response(&state))
}

async fn toggle_interface(State(state): State<Arc<AppState>>) -> Response {
    match state.service.toggle_interface().await {
        Ok(event) => (StatusCode::OK, Json(event)).into_response(),
        Err(e) => {
            warn!(error = %e, "Manual toggle failed");
            error_response(StatusCode::BAD_GATEWAY, e)
        }
    }
}

async fn toggle_pause(State(state): State<Arc<AppState>>) -> Json<StateResponse> {
    state.handle.toggle();
    Json(state_response(&state))
}

async fn set_interval(
    State(state): State<Arc<AppState>>,
    Json(request): Json<IntervalRequest>,
) -> Response {
    let (changed, config) = {
        let mut polling = state.polling.write().unwrap_or_else(|e| e.into_inner());
        let before = *polling;
        if let Some(ms) = request.interval_ms {
            polling.set_interval(Duration::from_millis(ms));
        }
        if let Some(delta) = request.delta_ms {
            polling.adjust(delta);
        }
        (before != *polling, *polling)
    };

    if changed {
        info!(
            interval_ms = config.interval().as_millis() as u64,
            "Polling interval changed"
        );
        if let Some(settings) = &state.settings {
            if let Err(e) = settings.save(&config) {
                warn!(error = %e, "Failed to save settings");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e));
            }
        }
    }

    Json(state_response(&state)).into_response()
}

/// Create the API router
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .route("/events", get(events))
        .route("/histogram", get(histogram))
        .route("/state", get(current_state))
        .route("/toggle", post(toggle_interface))
        .route("/pause", post(toggle_pause))
        .route("/interval", post(set_interval))
        .with_state(state)
}

/// Start the API server
pub async fn serve(addr: String, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = create_router(state);

    info!(addr = %addr, "Starting status API");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
