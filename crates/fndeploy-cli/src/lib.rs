//! Command-line adapter for fndeploy.
//!
//! Parses arguments, layers settings and dispatches to handlers that drive
//! a runtime delegate from `fndeploy-runtime`.
#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary only
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod parser;
pub mod utils;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::{Commands, EnvArgs, SourceArgs};
pub use error::CliError;
pub use parser::{Cli, SettingsArgs};
