//! Runtime delegate trait definition.
//!
//! A delegate is the per-runtime strategy the deploy pipeline talks to:
//! it knows how to validate, build, serve and discover one kind of source.

use async_trait::async_trait;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

use super::StopHandle;
use crate::domain::{DiscoveredSpec, EnvironmentVariables, RuntimeIdentifier};
use crate::error::RuntimeError;

/// Everything needed to decide whether a delegate applies to a source.
#[derive(Debug, Clone)]
pub struct DelegateContext {
    /// Project the functions will be deployed to.
    pub project_id: Option<String>,
    /// Directory holding the function sources.
    pub source_dir: PathBuf,
    /// Explicit runtime override (e.g. `go121`), bypassing version detection.
    pub runtime: Option<String>,
}

impl DelegateContext {
    /// Create a context for a source directory with no overrides.
    pub fn new(source_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_id: None,
            source_dir: source_dir.into(),
            runtime: None,
        }
    }

    /// Set the explicit runtime override.
    #[must_use]
    pub fn with_runtime(mut self, runtime: impl Into<String>) -> Self {
        self.runtime = Some(runtime.into());
        self
    }

    /// Set the target project id.
    #[must_use]
    pub fn with_project_id(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }
}

/// Build/serve/discover contract for one execution environment.
#[async_trait]
pub trait RuntimeDelegate: Send + Sync {
    /// Short delegate name, e.g. `golang`.
    fn name(&self) -> &'static str;

    /// Source language handled by this delegate.
    fn language(&self) -> &'static str;

    /// Runtime the functions will be deployed on.
    fn runtime(&self) -> RuntimeIdentifier;

    /// Check the source is deployable before any process is started.
    async fn validate(&self) -> Result<(), RuntimeError>;

    /// Produce whatever the runtime needs to serve the functions.
    async fn build(&self) -> Result<(), RuntimeError>;

    /// Launch the functions locally. The caller owns the returned handle.
    async fn serve(
        &self,
        port: u16,
        admin_port: u16,
        envs: &EnvironmentVariables,
    ) -> Result<Box<dyn StopHandle>, RuntimeError>;

    /// Determine the deployable spec. Any server started along the way is
    /// stopped before this returns.
    async fn discover_spec(
        &self,
        envs: &EnvironmentVariables,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredSpec, RuntimeError>;
}
