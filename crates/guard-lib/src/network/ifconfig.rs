//! `ifconfig`-backed network control

use super::{parse_interface_status, NetworkControl};
use crate::models::InterfaceStatus;
use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use std::process::Output;
use tokio::process::Command;
use tracing::debug;

/// Network control that runs `ifconfig`
///
/// State changes are run through a privilege prefix (`sudo` by default).
pub struct IfconfigNetwork {
    program: String,
    privilege_prefix: Option<String>,
}

impl IfconfigNetwork {
    pub fn new() -> Self {
        Self {
            program: "ifconfig".to_string(),
            privilege_prefix: Some("sudo".to_string()),
        }
    }

    /// Use a different binary in place of `ifconfig` (for testing)
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Set or clear the command prefix used for state changes
    pub fn with_privilege_prefix(mut self, prefix: Option<String>) -> Self {
        self.privilege_prefix = prefix;
        self
    }

    fn state_change_command(&self, name: &str, state: &str) -> Command {
        let mut cmd = match &self.privilege_prefix {
            Some(prefix) => {
                let mut cmd = Command::new(prefix);
                cmd.arg(&self.program);
                cmd
            }
            None => Command::new(&self.program),
        };
        cmd.arg(name).arg(state);
        cmd
    }

    async fn set_state(&self, name: &str, state: &str) -> Result<()> {
        debug!(interface = %name, state = %state, "Changing interface state");
        let output = self
            .state_change_command(name, state)
            .output()
            .await
            .with_context(|| format!("Failed to run {} {} {}", self.program, name, state))?;
        check_exit(&output, &self.program)
    }
}

impl Default for IfconfigNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkControl for IfconfigNetwork {
    async fn check_interface(&self, name: &str) -> Result<InterfaceStatus> {
        let output = Command::new(&self.program)
            .arg(name)
            .output()
            .await
            .with_context(|| format!("Failed to run {} {}", self.program, name))?;
        check_exit(&output, &self.program)?;

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(parse_interface_status(&text))
    }

    async fn disable_interface(&self, name: &str) -> Result<()> {
        self.set_state(name, "down").await
    }

    async fn enable_interface(&self, name: &str) -> Result<()> {
        self.set_state(name, "up").await
    }
}

fn check_exit(output: &Output, program: &str) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    bail!("{} exited with {}: {}", program, output.status, stderr.trim())
}

/// Whether the current process runs with an effective uid of root
pub fn has_elevated_privileges() -> bool {
    nix::unistd::Uid::effective().is_root()
}
