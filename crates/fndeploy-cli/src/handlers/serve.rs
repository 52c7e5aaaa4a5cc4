//! Serve command handler.
//!
//! Runs the functions locally until Ctrl-C, then stops the server the same
//! way discovery does: quit request first, forced kill after the grace period.
//! A server that exits on its own (a compile error in `go run`, a crash)
//! ends the command too.

use anyhow::Result;
use fndeploy_core::{RuntimeError, StopHandle};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::bootstrap::CliContext;
use crate::commands::{EnvArgs, SourceArgs};
use crate::error::CliError;
use crate::utils::env::collect_envs;

/// Execute the serve command.
pub async fn execute(
    ctx: &CliContext,
    source: &SourceArgs,
    port: u16,
    admin_port: u16,
    env: &EnvArgs,
) -> Result<()> {
    if port == admin_port {
        return Err(CliError::Arguments(format!(
            "--port and --admin-port must differ (both {port})"
        ))
        .into());
    }

    let envs = collect_envs(env)?;
    let delegate = ctx.delegate(source).await?;
    delegate.validate().await.map_err(CliError::from)?;

    let mut handle = delegate
        .serve(port, admin_port, &envs)
        .await
        .map_err(CliError::from)?;

    println!("Serving {} functions on http://localhost:{port}", delegate.runtime());
    println!("Press Ctrl+C to stop");

    match wait_until_done(handle.as_mut(), &ctx.cancel)
        .await
        .map_err(CliError::from)?
    {
        Ended::Interrupted => {}
        Ended::Exited(Some(0)) => {
            println!("Server exited");
            return Ok(());
        }
        Ended::Exited(code) => {
            warn!(?code, "Server exited unexpectedly");
            return Err(CliError::Process(format!(
                "functions server exited with {}",
                code.map_or_else(|| "a signal".to_string(), |c| format!("status {c}"))
            ))
            .into());
        }
    }

    let outcome = handle.stop().await.map_err(CliError::from)?;
    info!(code = ?outcome.code, forced = outcome.forced, "Server stopped");
    if outcome.forced {
        println!("Server did not exit in time and was killed");
    }
    Ok(())
}

/// Why serving ended.
#[derive(Debug, PartialEq, Eq)]
enum Ended {
    Interrupted,
    Exited(Option<i32>),
}

/// Wait for Ctrl-C or for the server to exit on its own, whichever is first.
async fn wait_until_done(
    handle: &mut dyn StopHandle,
    cancel: &CancellationToken,
) -> Result<Ended, RuntimeError> {
    tokio::select! {
        biased;
        () = cancel.cancelled() => Ok(Ended::Interrupted),
        code = handle.wait_exit() => code.map(Ended::Exited),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use fndeploy_core::StopOutcome;

    /// Handle whose server exits with `exit` immediately, or never when `None`.
    struct ScriptedHandle {
        exit: Option<Option<i32>>,
    }

    #[async_trait]
    impl StopHandle for ScriptedHandle {
        fn pid(&self) -> Option<u32> {
            None
        }

        async fn wait_exit(&mut self) -> Result<Option<i32>, RuntimeError> {
            match self.exit {
                Some(code) => Ok(code),
                None => std::future::pending().await,
            }
        }

        async fn stop(self: Box<Self>) -> Result<StopOutcome, RuntimeError> {
            Ok(StopOutcome {
                code: Some(0),
                forced: false,
            })
        }
    }

    #[tokio::test]
    async fn test_server_exit_ends_serving() {
        let mut handle = ScriptedHandle {
            exit: Some(Some(2)),
        };
        let ended = wait_until_done(&mut handle, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(ended, Ended::Exited(Some(2)));
    }

    #[tokio::test]
    async fn test_interrupt_ends_serving() {
        let mut handle = ScriptedHandle { exit: None };
        let cancel = CancellationToken::new();
        cancel.cancel();

        let ended = wait_until_done(&mut handle, &cancel).await.unwrap();
        assert_eq!(ended, Ended::Interrupted);
    }
}
