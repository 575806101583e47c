//! Network interface control
//!
//! The monitor talks to the operating system through the [`NetworkControl`]
//! trait. [`IfconfigNetwork`] implements it by shelling out to `ifconfig`.

mod ifconfig;
mod parser;

pub use ifconfig::{has_elevated_privileges, IfconfigNetwork};
pub use parser::parse_interface_status;

use crate::models::InterfaceStatus;
use anyhow::Result;

pub use async_trait::async_trait;

/// Capability used by the monitor to query and toggle an interface
#[async_trait]
pub trait NetworkControl: Send + Sync {
    /// Report whether the interface is up
    async fn check_interface(&self, name: &str) -> Result<InterfaceStatus>;

    /// Bring the interface down
    async fn disable_interface(&self, name: &str) -> Result<()>;

    /// Bring the interface up
    async fn enable_interface(&self, name: &str) -> Result<()>;
}
