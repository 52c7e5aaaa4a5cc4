//! Build command handler.

use anyhow::Result;
use fndeploy_runtime::{AUTOGEN_DIR, MAIN_FILE};

use crate::bootstrap::CliContext;
use crate::commands::SourceArgs;
use crate::error::CliError;

/// Execute the build command: generate the server entry point.
pub async fn execute(ctx: &CliContext, source: &SourceArgs) -> Result<()> {
    let delegate = ctx.delegate(source).await?;
    delegate.validate().await.map_err(CliError::from)?;
    delegate.build().await.map_err(CliError::from)?;

    println!(
        "Generated {} for runtime {}",
        source.source_dir.join(AUTOGEN_DIR).join(MAIN_FILE).display(),
        delegate.runtime()
    );
    Ok(())
}
