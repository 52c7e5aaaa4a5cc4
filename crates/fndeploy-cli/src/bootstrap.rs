//! CLI bootstrap - the composition root.
//!
//! Settings are layered here (defaults, then `FNDEPLOY_*` variables, then
//! command-line flags) and the delegate for a source directory is created.
//! Handlers receive the composed `CliContext`.

use fndeploy_core::{DelegateContext, RuntimeDelegate, Settings, validate_settings};
use fndeploy_runtime::{MANIFEST_FILE, delegate_for};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::commands::SourceArgs;
use crate::error::CliError;

/// Bootstrap configuration for the CLI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliConfig {
    /// Fully layered and validated settings.
    pub settings: Settings,
}

impl CliConfig {
    /// Defaults, then the process environment, then `overrides`.
    pub fn load(overrides: &Settings) -> Result<Self, CliError> {
        let env = Settings::from_env()?;
        Self::from_layers(&env, overrides)
    }

    /// Layer `env` and `overrides` on top of the defaults and validate the result.
    pub fn from_layers(env: &Settings, overrides: &Settings) -> Result<Self, CliError> {
        let mut settings = Settings::with_defaults();
        settings.merge(env);
        settings.merge(overrides);
        validate_settings(&settings)?;

        debug!(?settings, "Resolved settings");
        Ok(Self { settings })
    }
}

/// Composed context handed to command handlers.
pub struct CliContext {
    pub config: CliConfig,
    /// Cancelled on Ctrl-C.
    pub cancel: CancellationToken,
}

impl CliContext {
    pub const fn settings(&self) -> &Settings {
        &self.config.settings
    }

    /// Create the delegate for a source directory.
    ///
    /// A directory no delegate applies to is a configuration error here.
    pub async fn delegate(&self, source: &SourceArgs) -> Result<Box<dyn RuntimeDelegate>, CliError> {
        let mut ctx = DelegateContext::new(&source.source_dir);
        if let Some(ref runtime) = source.runtime {
            ctx = ctx.with_runtime(runtime);
        }
        if let Some(ref project) = source.project {
            ctx = ctx.with_project_id(project);
        }

        delegate_for(&ctx, self.settings())
            .await?
            .ok_or_else(|| {
                CliError::Config(format!(
                    "{} is not a Go module (no {MANIFEST_FILE}), or --runtime names another language",
                    source.source_dir.display()
                ))
            })
    }
}

/// Bootstrap the CLI application.
///
/// Installs the Ctrl-C handler that cancels long-running commands.
pub fn bootstrap(config: CliConfig) -> CliContext {
    let cancel = CancellationToken::new();

    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, shutting down");
            token.cancel();
        }
    });

    CliContext { config, cancel }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fndeploy_core::{DEFAULT_BASE_PORT, ProbeTarget};

    #[test]
    fn test_flags_override_environment() {
        let env = Settings::from_vars([
            ("FNDEPLOY_BASE_PORT".to_string(), "9000".to_string()),
            ("FNDEPLOY_SHUTDOWN_GRACE_SECS".to_string(), "5".to_string()),
        ])
        .unwrap();
        let flags = Settings {
            base_port: Some(9500),
            ..Settings::default()
        };

        let config = CliConfig::from_layers(&env, &flags).unwrap();
        assert_eq!(config.settings.effective_base_port(), 9500);
        assert_eq!(config.settings.shutdown_grace_secs, Some(5));
        assert_eq!(config.settings.probe_target(), ProbeTarget::default());
    }

    #[test]
    fn test_defaults_fill_gaps() {
        let config = CliConfig::from_layers(&Settings::default(), &Settings::default()).unwrap();
        assert_eq!(config.settings, Settings::with_defaults());
        assert_eq!(config.settings.effective_base_port(), DEFAULT_BASE_PORT);
    }

    #[test]
    fn test_invalid_layer_is_config_error() {
        let flags = Settings {
            shutdown_grace_secs: Some(0),
            ..Settings::default()
        };
        let err = CliConfig::from_layers(&Settings::default(), &flags).unwrap_err();
        assert_eq!(err.exit_code(), 78);
    }

    #[tokio::test]
    async fn test_non_go_directory_has_no_delegate() {
        let dir = tempfile::TempDir::new().unwrap();
        let ctx = bootstrap(CliConfig::from_layers(&Settings::default(), &Settings::default()).unwrap());
        let source = SourceArgs {
            source_dir: dir.path().to_path_buf(),
            runtime: None,
            project: None,
        };

        let err = ctx.delegate(&source).await.err().unwrap();
        assert_eq!(err.exit_code(), 78);
    }
}
