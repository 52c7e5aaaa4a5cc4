//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use clap::{Args, Parser};
use fndeploy_core::Settings;

use crate::commands::Commands;

/// Command-line interface for building, serving and discovering functions.
#[derive(Parser)]
#[command(name = "fndeploy")]
#[command(about = "Build, serve and discover Go functions")]
#[command(version)]
pub struct Cli {
    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub settings: SettingsArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags overriding `FNDEPLOY_*` settings for this invocation.
#[derive(Args, Debug, Default, Clone)]
pub struct SettingsArgs {
    /// First port tried when allocating server ports
    #[arg(long, global = true)]
    pub base_port: Option<u16>,

    /// Seconds to wait after the quit request before killing a server
    #[arg(long = "grace-secs", global = true)]
    pub shutdown_grace_secs: Option<u64>,

    /// Seconds to wait for a launched server to describe its functions
    #[arg(long, global = true)]
    pub probe_timeout_secs: Option<u64>,

    /// Fixed port queried for the functions spec
    #[arg(long, global = true, conflicts_with = "probe_allocated")]
    pub probe_port: Option<u16>,

    /// Query the allocated server port instead of the fixed probe port
    #[arg(long, global = true)]
    pub probe_allocated: bool,

    /// Go package that generates the server entry point
    #[arg(long, global = true)]
    pub codegen_package: Option<String>,
}

impl SettingsArgs {
    /// The settings explicitly given on the command line.
    pub fn to_settings(&self) -> Settings {
        Settings {
            base_port: self.base_port,
            shutdown_grace_secs: self.shutdown_grace_secs,
            probe_timeout_secs: self.probe_timeout_secs,
            probe_port: self.probe_port,
            probe_allocated: self.probe_allocated.then_some(true),
            codegen_package: self.codegen_package.clone(),
        }
    }
}
