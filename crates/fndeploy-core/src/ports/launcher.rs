//! Server launcher port.
//!
//! A launcher starts the user's functions as a local server and hands back
//! a [`StopHandle`]. Ownership of the running server moves into the handle;
//! consuming it with [`StopHandle::stop`] is the only way to get the process
//! reaped, and the returned future does not resolve until it is.

use async_trait::async_trait;
use std::path::Path;

use crate::domain::EnvironmentVariables;
use crate::error::RuntimeError;

/// How a stopped server went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StopOutcome {
    /// Exit code, if the process exited normally.
    pub code: Option<i32>,
    /// Whether the grace period elapsed and the process had to be killed.
    pub forced: bool,
}

/// Handle to a launched server.
#[async_trait]
pub trait StopHandle: Send {
    /// OS process id of the server, when known.
    fn pid(&self) -> Option<u32>;

    /// Wait until the server exits on its own, returning its exit code.
    ///
    /// Cancel-safe: dropping the future leaves the server running.
    async fn wait_exit(&mut self) -> Result<Option<i32>, RuntimeError>;

    /// Stop the server: graceful request first, forced kill after the grace period.
    ///
    /// Resolves once the process has exited.
    async fn stop(self: Box<Self>) -> Result<StopOutcome, RuntimeError>;
}

/// Starts a local server for a function source directory.
#[async_trait]
pub trait ServerLauncher: Send + Sync {
    /// Launch the server listening on `port`, with its control plane on `admin_port`.
    async fn start(
        &self,
        source_dir: &Path,
        port: u16,
        admin_port: u16,
        envs: &EnvironmentVariables,
    ) -> Result<Box<dyn StopHandle>, RuntimeError>;
}
