//! Interface monitoring
//!
//! [`MonitorService`] performs the check/decide/act/record cycle against a
//! [`NetworkControl`](crate::network::NetworkControl) capability;
//! [`MonitorLoop`] drives it on the polling interval.

mod r#loop;
mod service;


pub use r#loop::{MonitorHandle, MonitorLoop, MonitorState, TickOutcome};
pub use service::{MonitorService, MonitorServiceBuilder, DEFAULT_INTERFACE};
