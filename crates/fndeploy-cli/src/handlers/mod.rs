//! Command handlers.
//!
//! Handlers follow the pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that:
//!   1. Parse/validate CLI-specific input
//!   2. Call the runtime delegate
//!   3. Format output for the terminal

pub mod build;
pub mod discover;
pub mod runtimes;
pub mod serve;
