//! Interface guard library
//!
//! This crate provides the event pipeline for keeping one network interface
//! down:
//! - Interface status parsing and `ifconfig`-backed control
//! - The polling monitor that disables the interface when it comes up
//! - A durable, date-partitioned event log with startup recovery
//! - An in-memory recent-event index and histogram aggregation
//! - Health checks, metrics and a local status API

pub mod api;
pub mod error;
pub mod health;
pub mod models;
pub mod monitor;
pub mod network;
pub mod observability;
pub mod settings;
pub mod stats;
pub mod store;

pub use error::{LogStoreError, MonitorError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{GuardMetrics, StructuredLogger};
