//! CLI-specific error types and mappings.
//!
//! Maps delegate errors to exit codes and user-facing messages.

use fndeploy_core::{ConfigError, ProcessError, RuntimeError, SettingsError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// The functions spec could not be read or is invalid.
    #[error("Invalid functions spec: {0}")]
    Data(String),

    /// The launched server never answered.
    #[error("Server unavailable: {0}")]
    Unavailable(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Process execution error.
    #[error("Process error: {0}")]
    Process(String),

    /// Interrupted by the user.
    #[error("Interrupted")]
    Cancelled,
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions (errors outside these categories
    /// exit with 1):
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Specific error categories (see sysexits.h)
    /// - 130: Terminated by Ctrl-C
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Arguments(_) => 2,    // EX_USAGE
            Self::Data(_) => 65,        // EX_DATAERR
            Self::Unavailable(_) => 69, // EX_UNAVAILABLE
            Self::Process(_) => 71,     // EX_OSERR
            Self::Io(_) => 74,          // EX_IOERR
            Self::Config(_) => 78,      // EX_CONFIG
            Self::Cancelled => 130,
        }
    }
}

impl From<RuntimeError> for CliError {
    fn from(err: RuntimeError) -> Self {
        match err {
            RuntimeError::Config(config) => config.into(),
            RuntimeError::Process(process) => process.into(),
            err @ RuntimeError::Codegen { .. } => Self::Process(err.to_string()),
            err @ RuntimeError::Io { .. } => Self::Io(err.to_string()),
            err @ (RuntimeError::SpecParse { .. } | RuntimeError::InvalidSpec(_)) => {
                Self::Data(err.to_string())
            }
            err @ (RuntimeError::Probe { .. } | RuntimeError::ProbeTimeout { .. }) => {
                Self::Unavailable(err.to_string())
            }
            RuntimeError::Cancelled => Self::Cancelled,
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<SettingsError> for CliError {
    fn from(err: SettingsError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<ProcessError> for CliError {
    fn from(err: ProcessError) -> Self {
        Self::Process(err.to_string())
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}
