//! Discover command handler.
//!
//! Prints the functions spec as JSON on stdout; logs go to stderr.

use anyhow::Result;

use crate::bootstrap::CliContext;
use crate::commands::{EnvArgs, SourceArgs};
use crate::error::CliError;
use crate::utils::env::collect_envs;

/// Execute the discover command.
pub async fn execute(ctx: &CliContext, source: &SourceArgs, env: &EnvArgs) -> Result<()> {
    let envs = collect_envs(env)?;
    let delegate = ctx.delegate(source).await?;
    delegate.validate().await.map_err(CliError::from)?;

    let spec = delegate
        .discover_spec(&envs, &ctx.cancel)
        .await
        .map_err(CliError::from)?;

    println!("{}", serde_json::to_string_pretty(&spec)?);
    Ok(())
}
