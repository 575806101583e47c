//! Error types for the event pipeline

use std::path::PathBuf;
use std::time::Duration;

/// Failure of a monitor operation
///
/// Persistence failures are not represented here: a failed log append after a
/// successful action is logged and counted, never returned.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    /// The interface status could not be queried
    #[error("failed to query {interface}: {source}")]
    Query {
        interface: String,
        #[source]
        source: anyhow::Error,
    },

    /// Enabling or disabling the interface failed
    #[error("failed to {action} {interface}: {source}")]
    Action {
        interface: String,
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// A bounded operation did not finish in time
    #[error("{operation} on {interface} timed out after {elapsed:?}")]
    Timeout {
        interface: String,
        operation: &'static str,
        elapsed: Duration,
    },
}

/// Failure reading or writing a log partition
#[derive(Debug, thiserror::Error)]
pub enum LogStoreError {
    #[error("failed to create log directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to append to {}: {source}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
