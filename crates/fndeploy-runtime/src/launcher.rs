//! Local server launcher for generated Go entry points.
//!
//! The server reads its ports from `PORT` and `ADMIN_PORT`. Shutdown is a
//! two step affair: a best-effort `GET /__/quitquitquit` on the admin port,
//! then a grace period after which the whole process group is killed.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use fndeploy_core::{
    DEFAULT_SHUTDOWN_GRACE_SECS, EnvironmentVariables, RuntimeError, ServerLauncher, Settings,
    StopHandle, StopOutcome,
};
use reqwest::Client;
use tracing::{debug, info};

use crate::codegen::{AUTOGEN_DIR, MAIN_FILE};
use crate::process::{
    ChildProcess, ProcessRunner, SpawnOptions, StdioMode, shutdown_child, spawn_stream_reader,
};

/// Environment variable carrying the serving port.
pub const PORT_ENV: &str = "PORT";

/// Environment variable carrying the admin (control plane) port.
pub const ADMIN_PORT_ENV: &str = "ADMIN_PORT";

/// Admin endpoint asking the server to exit.
pub const QUIT_PATH: &str = "/__/quitquitquit";

/// Grace period between the quit request and the forced kill.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS);

const QUIT_REQUEST_TIMEOUT: Duration = Duration::from_secs(1);

/// Inherited variables re-applied last, so user envs cannot break the toolchain.
const TOOLCHAIN_ENV: [&str; 2] = ["PATH", "GOPATH"];

/// Build the exact environment for a server process.
///
/// Layers, later winning: `inherited`, then `envs`, then `PORT` and
/// `ADMIN_PORT`, then `PATH` and `GOPATH` from `inherited` (only those
/// actually present there).
pub fn layered_environment<I>(
    inherited: I,
    envs: &EnvironmentVariables,
    port: u16,
    admin_port: u16,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let inherited: BTreeMap<String, String> = inherited.into_iter().collect();

    let mut merged = inherited.clone();
    merged.extend(envs.iter().map(|(k, v)| (k.clone(), v.clone())));
    merged.insert(PORT_ENV.to_string(), port.to_string());
    merged.insert(ADMIN_PORT_ENV.to_string(), admin_port.to_string());

    for key in TOOLCHAIN_ENV {
        if let Some(value) = inherited.get(key) {
            merged.insert(key.to_string(), value.clone());
        }
    }

    merged
}

/// The current process environment, skipping entries that are not valid UTF-8.
fn process_environment() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}

/// Command used to run the generated server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerCommand {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for ServerCommand {
    /// `go run ./autogen/main.go`
    fn default() -> Self {
        Self {
            program: "go".to_string(),
            args: vec!["run".to_string(), format!("./{AUTOGEN_DIR}/{MAIN_FILE}")],
        }
    }
}

impl ServerCommand {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Launches generated Go servers as child processes.
#[derive(Debug, Clone)]
pub struct GoServerLauncher {
    runner: ProcessRunner,
    command: ServerCommand,
    grace: Duration,
    client: Client,
}

impl Default for GoServerLauncher {
    fn default() -> Self {
        Self::new(DEFAULT_SHUTDOWN_GRACE)
    }
}

impl GoServerLauncher {
    pub fn new(grace: Duration) -> Self {
        Self {
            runner: ProcessRunner::new(),
            command: ServerCommand::default(),
            grace,
            // Quit requests target 127.0.0.1 and must never go through a proxy
            client: Client::builder().no_proxy().build().unwrap_or_default(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.effective_shutdown_grace())
    }

    /// Replace the server command (the default runs the generated entry point).
    #[must_use]
    pub fn with_command(mut self, command: ServerCommand) -> Self {
        self.command = command;
        self
    }

    pub const fn grace(&self) -> Duration {
        self.grace
    }
}

#[async_trait]
impl ServerLauncher for GoServerLauncher {
    async fn start(
        &self,
        source_dir: &Path,
        port: u16,
        admin_port: u16,
        envs: &EnvironmentVariables,
    ) -> Result<Box<dyn StopHandle>, RuntimeError> {
        let env = layered_environment(process_environment(), envs, port, admin_port);
        let options = SpawnOptions::new()
            .with_working_dir(source_dir)
            .with_exact_env(env)
            .with_stdout(StdioMode::Piped)
            .with_stderr(StdioMode::Inherit);

        let mut child = self
            .runner
            .spawn(&self.command.program, &self.command.args, &options)?;

        if let Some(stdout) = child.take_stdout() {
            spawn_stream_reader(stdout, port, "stdout");
        }

        info!(
            pid = ?child.pid(),
            port = %port,
            admin_port = %admin_port,
            dir = %source_dir.display(),
            "Started functions server"
        );

        Ok(Box::new(ServerGuard {
            child,
            port,
            admin_port,
            grace: self.grace,
            client: self.client.clone(),
        }))
    }
}

/// A running server. Dropping it without calling `stop` kills the process.
#[derive(Debug)]
pub struct ServerGuard {
    child: ChildProcess,
    port: u16,
    admin_port: u16,
    grace: Duration,
    client: Client,
}

impl ServerGuard {
    pub const fn port(&self) -> u16 {
        self.port
    }

    pub const fn admin_port(&self) -> u16 {
        self.admin_port
    }

    /// Ask the server to exit. Failures are expected (the server may not
    /// be listening yet, or already gone) and only logged.
    async fn request_quit(&self) {
        let url = format!("http://127.0.0.1:{}{QUIT_PATH}", self.admin_port);
        match self
            .client
            .get(&url)
            .timeout(QUIT_REQUEST_TIMEOUT)
            .send()
            .await
        {
            Ok(response) => debug!(url = %url, status = %response.status(), "Sent quit request"),
            Err(e) => debug!(url = %url, error = %e, "Quit request failed, relying on grace period"),
        }
    }
}

#[async_trait]
impl StopHandle for ServerGuard {
    fn pid(&self) -> Option<u32> {
        self.child.pid()
    }

    async fn wait_exit(&mut self) -> Result<Option<i32>, RuntimeError> {
        match self.child.wait().await {
            Ok(status) => {
                info!(port = %self.port, status = ?status.code(), "Functions server exited");
                Ok(status.code())
            }
            Err(e) => Err(self.child.io_error(e).into()),
        }
    }

    async fn stop(self: Box<Self>) -> Result<StopOutcome, RuntimeError> {
        let mut guard = *self;
        guard.request_quit().await;

        let shutdown = match shutdown_child(&mut guard.child, guard.grace).await {
            Ok(shutdown) => shutdown,
            Err(e) => return Err(guard.child.io_error(e).into()),
        };

        info!(
            port = %guard.port,
            status = ?shutdown.status.code(),
            forced = shutdown.forced,
            "Stopped functions server"
        );

        Ok(StopOutcome {
            code: shutdown.status.code(),
            forced: shutdown.forced,
        })
    }
}
