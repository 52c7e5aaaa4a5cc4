//! Error taxonomy for runtime delegates.
//!
//! - `ConfigError`: the source or settings are wrong; fatal, never retried.
//! - `ProcessError`: an OS process could not be started or failed.
//! - `RuntimeError`: everything a delegate operation can return, wrapping
//!   the two above with discovery- and codegen-specific failures.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::domain::SpecError;
use crate::settings::SettingsError;

/// Configuration problems detected before any process is started.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unsupported Go version \"{version}\"; supported versions are {}", .supported.join(", "))]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    #[error("go.mod does not declare a Go version and no runtime was configured")]
    MissingGoVersion,

    #[error("go.mod does not declare a module name")]
    MissingModuleName,

    #[error("invalid go.mod at line {line}: {reason}")]
    InvalidManifest { line: usize, reason: String },

    #[error("unknown runtime \"{0}\"")]
    UnknownRuntime(String),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Failures starting, running or probing OS processes.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("executable not found: {command}")]
    NotFound { command: String },

    #[error("failed to spawn {command}: {source}")]
    SpawnFailed {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {}:\n{stderr}", exit_label(.code))]
    NonZeroExit {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("no free port in range {start}-{end}")]
    NoFreePort { start: u16, end: u16 },

    #[error("I/O error on process {command}: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },
}

/// Errors returned by delegate operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("process error: {0}")]
    Process(#[from] ProcessError),

    #[error("code generation failed with {}:\n{stderr}", exit_label(.code))]
    Codegen { code: Option<i32>, stderr: String },

    #[error("I/O error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse spec from {origin}: {reason}")]
    SpecParse { origin: String, reason: String },

    #[error("invalid spec: {0}")]
    InvalidSpec(#[from] SpecError),

    #[error("spec probe to {url} failed: {reason}")]
    Probe { url: String, reason: String },

    #[error("timed out after {}s waiting for {url}", .waited.as_secs())]
    ProbeTimeout { url: String, waited: Duration },

    #[error("discovery cancelled")]
    Cancelled,
}

impl RuntimeError {
    /// Create an `Io` error for the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error reflects bad configuration rather than a runtime failure.
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

fn exit_label(code: &Option<i32>) -> String {
    code.map_or_else(
        || "no exit status (terminated by signal)".to_string(),
        |code| format!("exit status {code}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codegen_error_embeds_stderr() {
        let err = RuntimeError::Codegen {
            code: Some(1),
            stderr: "module not found".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("exit status 1"));
        assert!(message.contains("module not found"));
    }

    #[test]
    fn non_zero_exit_without_code_mentions_signal() {
        let err = ProcessError::NonZeroExit {
            command: "go run".to_string(),
            code: None,
            stderr: String::new(),
        };
        assert!(err.to_string().contains("signal"));
    }

    #[test]
    fn config_errors_are_classified() {
        let err: RuntimeError = ConfigError::MissingGoVersion.into();
        assert!(err.is_config());
        assert!(!RuntimeError::Cancelled.is_config());
    }
}
