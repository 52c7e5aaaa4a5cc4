//! Grace-period shutdown for child processes with forced-kill escalation.

use std::io;
use std::process::ExitStatus;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use super::ChildProcess;

#[cfg(unix)]
use nix::errno::Errno;
#[cfg(unix)]
use nix::sys::signal::{Signal, killpg};
#[cfg(unix)]
use nix::unistd::Pid;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shutdown {
    pub status: ExitStatus,
    /// True if the grace period elapsed and the process was killed.
    pub forced: bool,
}

/// Wait for a child to exit on its own, killing it once `grace` elapses.
///
/// # Strategy
/// 1. Wait up to `grace` for the process to exit (the caller has already
///    asked it to, e.g. through an admin endpoint)
/// 2. If still running, send SIGKILL to its process group
/// 3. Wait for reaping (required to avoid zombies)
///
/// # Platform behavior
/// - Unix: `killpg(SIGKILL)`, falling back to killing the child alone
/// - Windows: `TerminateProcess` via `Child::start_kill`
pub async fn shutdown_child(child: &mut ChildProcess, grace: Duration) -> io::Result<Shutdown> {
    if let Ok(result) = timeout(grace, child.wait()).await {
        let status = result?;
        debug!(pid = ?child.pid(), ?status, "Child exited within grace period");
        return Ok(Shutdown {
            status,
            forced: false,
        });
    }

    warn!(
        pid = ?child.pid(),
        grace_secs = grace.as_secs_f32(),
        command = %child.command(),
        "Child did not exit within grace period, killing"
    );
    force_kill(child)?;

    let status = child.wait().await?;
    Ok(Shutdown {
        status,
        forced: true,
    })
}

fn force_kill(child: &mut ChildProcess) -> io::Result<()> {
    #[cfg(unix)]
    if let Some(pid) = child.pid() {
        match kill_group(pid) {
            Ok(()) => return Ok(()),
            Err(Errno::ESRCH) => {
                // Group already gone; the leader may still need a direct kill
            }
            Err(e) => debug!(pid, error = %e, "killpg failed, killing child directly"),
        }
    }

    child.start_kill()
}

/// Send SIGKILL to the process group led by `pid`.
#[cfg(unix)]
pub(crate) fn kill_group(pid: u32) -> Result<(), Errno> {
    let pgid = i32::try_from(pid).map_err(|_| Errno::EINVAL)?;
    killpg(Pid::from_raw(pgid), Signal::SIGKILL)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::{ProcessRunner, SpawnOptions};
    use std::time::Instant;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn kills_process_that_ignores_the_grace_period() {
        let mut child = ProcessRunner::new()
            .spawn("sleep", &args(&["30"]), &SpawnOptions::new())
            .unwrap();

        let started = Instant::now();
        let shutdown = shutdown_child(&mut child, Duration::from_millis(200))
            .await
            .unwrap();

        assert!(shutdown.forced);
        assert!(!shutdown.status.success());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    /// A killed process is either gone or a zombie waiting for its new parent.
    #[cfg(target_os = "linux")]
    fn is_dead(pid: i32) -> bool {
        std::fs::read_to_string(format!("/proc/{pid}/stat")).map_or(true, |stat| {
            stat.rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state == "Z" || state == "X")
        })
    }

    #[tokio::test]
    #[cfg(target_os = "linux")]
    async fn kill_reaches_grandchildren() {
        let dir = tempfile::TempDir::new().unwrap();
        let pid_file = dir.path().join("grandchild.pid");
        let script = format!("sleep 30 & echo $! > {}; wait", pid_file.display());

        let mut child = ProcessRunner::new()
            .spawn("sh", &args(&["-c", &script]), &SpawnOptions::new())
            .unwrap();

        let mut recorded = String::new();
        for _ in 0..100 {
            recorded = std::fs::read_to_string(&pid_file).unwrap_or_default();
            if recorded.ends_with('\n') {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let grandchild: i32 = recorded.trim().parse().unwrap();

        let shutdown = shutdown_child(&mut child, Duration::from_millis(100))
            .await
            .unwrap();
        assert!(shutdown.forced);

        let mut dead = false;
        for _ in 0..50 {
            if is_dead(grandchild) {
                dead = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(dead, "grandchild {grandchild} survived the group kill");
    }

    #[tokio::test]
    #[cfg(unix)]
    async fn handles_already_exited_child() {
        let mut child = ProcessRunner::new()
            .spawn("echo", &args(&["test"]), &SpawnOptions::new())
            .unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;

        let shutdown = shutdown_child(&mut child, Duration::from_secs(5))
            .await
            .unwrap();
        assert!(!shutdown.forced);
        assert!(shutdown.status.success());
    }
}
