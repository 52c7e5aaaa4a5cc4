//! Spawning child processes and running commands to completion.

use fndeploy_core::ProcessError;
use std::io;
use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use tokio::process::{Child, ChildStdout, Command};
use tracing::debug;

/// Where a child's output stream goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StdioMode {
    /// Captured by the parent.
    Piped,
    /// Shared with the parent's stream.
    Inherit,
    /// Discarded.
    #[default]
    Null,
}

impl From<StdioMode> for Stdio {
    fn from(mode: StdioMode) -> Self {
        match mode {
            StdioMode::Piped => Self::piped(),
            StdioMode::Inherit => Self::inherit(),
            StdioMode::Null => Self::null(),
        }
    }
}

/// Options for a spawned process. Stdin is always closed.
#[derive(Debug, Clone, Default)]
pub struct SpawnOptions {
    /// Working directory (defaults to the parent's).
    pub working_dir: Option<PathBuf>,
    /// Environment overrides, applied in order; later entries win.
    pub env: Vec<(String, String)>,
    /// Start from an empty environment instead of inheriting the parent's.
    pub clear_env: bool,
    pub stdout: StdioMode,
    pub stderr: StdioMode,
}

impl SpawnOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Replace the whole environment with `env`.
    #[must_use]
    pub fn with_exact_env<I>(mut self, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        self.clear_env = true;
        self.env = env.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    #[must_use]
    pub const fn with_stdout(mut self, mode: StdioMode) -> Self {
        self.stdout = mode;
        self
    }

    #[must_use]
    pub const fn with_stderr(mut self, mode: StdioMode) -> Self {
        self.stderr = mode;
        self
    }
}

/// Captured result of a command run to completion.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code; `None` if the process was killed by a signal.
    pub status: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

impl CommandOutput {
    pub const fn success(&self) -> bool {
        matches!(self.status, Some(0))
    }

    /// Turn a non-zero exit into `ProcessError::NonZeroExit` carrying stderr.
    pub fn check(self, command: &str) -> Result<Self, ProcessError> {
        if self.success() {
            Ok(self)
        } else {
            Err(ProcessError::NonZeroExit {
                command: command.to_string(),
                code: self.status,
                stderr: self.stderr,
            })
        }
    }
}

/// Spawns OS processes.
///
/// On unix every child leads its own process group, so that a forced kill
/// also reaches anything the child started (`go run` builds and then execs a
/// second binary).
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub const fn new() -> Self {
        Self
    }

    /// Spawn a child process and return its handle.
    pub fn spawn(
        &self,
        command: &str,
        args: &[String],
        options: &SpawnOptions,
    ) -> Result<ChildProcess, ProcessError> {
        let mut cmd = build_command(command, args, options);
        let child = cmd.spawn().map_err(|e| spawn_error(command, e))?;
        let label = command_line(command, args);

        debug!(command = %label, pid = ?child.id(), "Spawned child process");
        Ok(ChildProcess::new(child, label))
    }

    /// Run a command to completion, capturing stdout and stderr.
    ///
    /// A non-zero exit is *not* an error here; see [`CommandOutput::check`].
    pub async fn run(
        &self,
        command: &str,
        args: &[String],
        options: &SpawnOptions,
    ) -> Result<CommandOutput, ProcessError> {
        let options = options
            .clone()
            .with_stdout(StdioMode::Piped)
            .with_stderr(StdioMode::Piped);
        let output = build_command(command, args, &options)
            .output()
            .await
            .map_err(|e| spawn_error(command, e))?;

        debug!(
            command = %command_line(command, args),
            status = ?output.status.code(),
            stdout_bytes = output.stdout.len(),
            "Command finished"
        );

        Ok(CommandOutput {
            status: output.status.code(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn build_command(command: &str, args: &[String], options: &SpawnOptions) -> Command {
    let mut cmd = Command::new(command);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(options.stdout)
        .stderr(options.stderr)
        .kill_on_drop(true);

    if let Some(ref dir) = options.working_dir {
        cmd.current_dir(dir);
    }
    if options.clear_env {
        cmd.env_clear();
    }
    for (key, value) in &options.env {
        cmd.env(key, value);
    }

    #[cfg(unix)]
    cmd.process_group(0);

    cmd
}

fn spawn_error(command: &str, error: io::Error) -> ProcessError {
    if error.kind() == io::ErrorKind::NotFound {
        ProcessError::NotFound {
            command: command.to_string(),
        }
    } else {
        ProcessError::SpawnFailed {
            command: command.to_string(),
            source: error,
        }
    }
}

fn command_line(command: &str, args: &[String]) -> String {
    std::iter::once(command)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// A running child process.
///
/// Dropping a handle whose process has not been reaped kills the process
/// (and on unix its whole group), so an abandoned server never outlives
/// the task that launched it.
#[derive(Debug)]
pub struct ChildProcess {
    child: Child,
    pid: Option<u32>,
    command: String,
    reaped: bool,
}

impl ChildProcess {
    fn new(child: Child, command: String) -> Self {
        let pid = child.id();
        Self {
            child,
            pid,
            command,
            reaped: false,
        }
    }

    /// Process id captured at spawn time (stays available after exit).
    pub const fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// The command line this process was started with.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Take ownership of the piped stdout stream, if any.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Wait for the process to exit and reap it.
    pub async fn wait(&mut self) -> io::Result<ExitStatus> {
        let status = self.child.wait().await?;
        self.reaped = true;
        Ok(status)
    }

    /// Check for exit without blocking.
    pub fn try_wait(&mut self) -> io::Result<Option<ExitStatus>> {
        let status = self.child.try_wait()?;
        if status.is_some() {
            self.reaped = true;
        }
        Ok(status)
    }

    /// Send a kill signal without waiting for exit.
    pub(crate) fn start_kill(&mut self) -> io::Result<()> {
        self.child.start_kill()
    }

    pub(crate) fn io_error(&self, source: io::Error) -> ProcessError {
        ProcessError::Io {
            command: self.command.clone(),
            source,
        }
    }
}

impl Drop for ChildProcess {
    fn drop(&mut self) {
        if self.reaped {
            return;
        }
        #[cfg(unix)]
        if let Some(pid) = self.pid {
            let _ = super::shutdown::kill_group(pid);
        }
        let _ = self.child.start_kill();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    async fn missing_executable_is_not_found() {
        let runner = ProcessRunner::new();
        let err = runner
            .run("fndeploy-definitely-missing-binary", &[], &SpawnOptions::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ProcessError::NotFound { .. }));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn run_captures_output_and_status() {
        let runner = ProcessRunner::new();
        let output = runner
            .run(
                "sh",
                &args(&["-c", "echo out; echo err >&2; exit 3"]),
                &SpawnOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(output.status, Some(3));
        assert_eq!(output.stdout, b"out\n");
        assert_eq!(output.stderr.trim(), "err");

        let err = output.check("sh").unwrap_err();
        assert!(err.to_string().contains("err"));
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn exact_env_replaces_inherited_environment() {
        let runner = ProcessRunner::new();
        let options = SpawnOptions::new()
            .with_exact_env([("ONLY".to_string(), "value".to_string())]);
        let output = runner
            .run("/bin/sh", &args(&["-c", "echo \"$ONLY:${HOME:-unset}\""]), &options)
            .await
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "value:unset");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn later_env_entries_win() {
        let runner = ProcessRunner::new();
        let options = SpawnOptions::new()
            .with_env("LAYER", "first")
            .with_env("LAYER", "second");
        let output = runner
            .run("sh", &args(&["-c", "echo $LAYER"]), &options)
            .await
            .unwrap();

        assert_eq!(String::from_utf8_lossy(&output.stdout).trim(), "second");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn spawn_runs_in_working_dir() {
        let dir = tempfile::TempDir::new().unwrap();
        let runner = ProcessRunner::new();
        let options = SpawnOptions::new()
            .with_working_dir(dir.path())
            .with_stdout(StdioMode::Null);
        let mut child = runner
            .spawn("sh", &args(&["-c", "touch marker"]), &options)
            .unwrap();

        assert!(child.pid().is_some());
        let status = child.wait().await.unwrap();
        assert!(status.success());
        assert!(dir.path().join("marker").exists());
    }
}
