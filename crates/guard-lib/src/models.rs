//! Core data models for the interface guard

use chrono::{DateTime, Local, Timelike};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Lower bound for the polling interval
pub const MIN_POLLING_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound for the polling interval
pub const MAX_POLLING_INTERVAL: Duration = Duration::from_secs(60);

/// Polling interval used when nothing is configured
pub const DEFAULT_POLLING_INTERVAL: Duration = Duration::from_secs(1);

/// Kind of action recorded in an [`Event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    Check,
    Enable,
    Disable,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Check => "Check",
            EventKind::Enable => "Enable",
            EventKind::Disable => "Disable",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name one of the closed event kinds
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown event kind: {0:?}")]
pub struct UnknownEventKind(pub String);

impl FromStr for EventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Check" => Ok(EventKind::Check),
            "Enable" => Ok(EventKind::Enable),
            "Disable" => Ok(EventKind::Disable),
            other => Err(UnknownEventKind(other.to_string())),
        }
    }
}

/// A single observation or action taken on the guarded interface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub timestamp: DateTime<Local>,
    pub kind: EventKind,
    pub message: String,
}

impl Event {
    /// Create an event stamped with the current local time, truncated to whole seconds
    pub fn new(kind: EventKind, message: impl Into<String>) -> Self {
        Self::at(truncate_to_second(Local::now()), kind, message)
    }

    /// Create an event at an explicit instant
    pub fn at(timestamp: DateTime<Local>, kind: EventKind, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            kind,
            message: message.into(),
        }
    }
}

/// Drop the sub-second part of a timestamp
pub fn truncate_to_second(ts: DateTime<Local>) -> DateTime<Local> {
    ts.with_nanosecond(0).unwrap_or(ts)
}

/// Link state of a network interface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterfaceStatus {
    Up,
    Down,
    /// Not yet checked
    Unknown,
}

impl fmt::Display for InterfaceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterfaceStatus::Up => f.write_str("UP"),
            InterfaceStatus::Down => f.write_str("DOWN"),
            InterfaceStatus::Unknown => f.write_str("Unknown"),
        }
    }
}

/// Polling interval, kept within [`MIN_POLLING_INTERVAL`, `MAX_POLLING_INTERVAL`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollingConfig {
    interval: Duration,
}

impl PollingConfig {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval: clamp_interval(interval),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = clamp_interval(interval);
    }

    /// Shift the interval by a signed number of milliseconds.
    /// Returns true if the stored value changed.
    pub fn adjust(&mut self, delta_ms: i64) -> bool {
        let current = self.interval.as_millis() as i64;
        let target = current.saturating_add(delta_ms).max(0) as u64;
        let before = self.interval;
        self.set_interval(Duration::from_millis(target));
        before != self.interval
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_POLLING_INTERVAL)
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.clamp(MIN_POLLING_INTERVAL, MAX_POLLING_INTERVAL)
}

/// Polling configuration shared between the loop and whoever edits it
pub type SharedPollingConfig = Arc<RwLock<PollingConfig>>;

/// One fixed-width slice of a histogram window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub label: String,
    pub count: usize,
}
