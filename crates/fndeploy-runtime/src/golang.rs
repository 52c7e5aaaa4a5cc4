//! Runtime delegate for Go function sources.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use fndeploy_core::{
    ConfigError, DelegateContext, DiscoveredSpec, EnvironmentVariables, Module, RuntimeDelegate,
    RuntimeError, RuntimeIdentifier, ServerLauncher, Settings, StopHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::codegen::CodeGenerator;
use crate::discovery::SpecDiscoverer;
use crate::launcher::GoServerLauncher;
use crate::manifest::read_module;
use crate::probe::HttpSpecProbe;
use crate::process::PortAllocator;

/// Prefix shared by every Go runtime identifier.
const GO_RUNTIME_PREFIX: &str = "go";

/// Pick the runtime for a module.
///
/// An explicit runtime is taken as given (`Ok(None)` when it names a
/// non-Go runtime). Otherwise the module's `go` directive decides.
pub fn resolve_runtime(
    module: &Module,
    explicit: Option<&str>,
) -> Result<Option<RuntimeIdentifier>, ConfigError> {
    if let Some(runtime) = explicit {
        if !runtime.starts_with(GO_RUNTIME_PREFIX) {
            return Ok(None);
        }
        return runtime.parse().map(Some);
    }

    let version = module
        .go_version
        .as_deref()
        .ok_or(ConfigError::MissingGoVersion)?;
    RuntimeIdentifier::from_go_version(version).map(Some)
}

/// Builds, serves and discovers Go functions.
pub struct GolangDelegate {
    source_dir: PathBuf,
    project_id: Option<String>,
    module: Module,
    runtime: RuntimeIdentifier,
    codegen: CodeGenerator,
    launcher: Arc<dyn ServerLauncher>,
    discoverer: SpecDiscoverer,
}

impl std::fmt::Debug for GolangDelegate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GolangDelegate")
            .field("source_dir", &self.source_dir)
            .field("module", &self.module.name)
            .field("runtime", &self.runtime)
            .finish_non_exhaustive()
    }
}

impl GolangDelegate {
    /// Create a delegate with default settings.
    ///
    /// Returns `Ok(None)` when the source is not a Go module, or when an
    /// explicit non-Go runtime was requested.
    pub async fn try_create(ctx: &DelegateContext) -> Result<Option<Self>, RuntimeError> {
        Self::try_create_with(ctx, &Settings::with_defaults()).await
    }

    /// Create a delegate using `settings` for ports, timeouts and codegen.
    pub async fn try_create_with(
        ctx: &DelegateContext,
        settings: &Settings,
    ) -> Result<Option<Self>, RuntimeError> {
        let Some(module) = read_module(&ctx.source_dir).await? else {
            return Ok(None);
        };

        let Some(runtime) = resolve_runtime(&module, ctx.runtime.as_deref())? else {
            debug!(runtime = ?ctx.runtime, "Explicit runtime is not a Go runtime");
            return Ok(None);
        };

        info!(module = %module.name, runtime = %runtime, "Using Go delegate");

        let launcher: Arc<dyn ServerLauncher> = Arc::new(GoServerLauncher::from_settings(settings));
        let discoverer = SpecDiscoverer::new(
            PortAllocator::new(settings.effective_base_port()),
            Arc::clone(&launcher),
            Arc::new(HttpSpecProbe::new(settings.effective_probe_timeout())),
        )
        .with_probe_target(settings.probe_target());

        Ok(Some(Self {
            source_dir: ctx.source_dir.clone(),
            project_id: ctx.project_id.clone(),
            module,
            runtime,
            codegen: CodeGenerator::new(settings.effective_codegen_package()),
            launcher,
            discoverer,
        }))
    }

    /// Replace the code generator used by `build`.
    #[must_use]
    pub fn with_code_generator(mut self, codegen: CodeGenerator) -> Self {
        self.codegen = codegen;
        self
    }

    pub const fn module(&self) -> &Module {
        &self.module
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }
}

#[async_trait]
impl RuntimeDelegate for GolangDelegate {
    fn name(&self) -> &'static str {
        "golang"
    }

    fn language(&self) -> &'static str {
        "go"
    }

    fn runtime(&self) -> RuntimeIdentifier {
        self.runtime
    }

    async fn validate(&self) -> Result<(), RuntimeError> {
        if self.module.name.trim().is_empty() {
            return Err(ConfigError::MissingModuleName.into());
        }

        let metadata = tokio::fs::metadata(&self.source_dir)
            .await
            .map_err(|e| RuntimeError::io(&self.source_dir, e))?;
        if !metadata.is_dir() {
            return Err(RuntimeError::io(
                &self.source_dir,
                std::io::Error::new(std::io::ErrorKind::NotADirectory, "not a directory"),
            ));
        }

        Ok(())
    }

    async fn build(&self) -> Result<(), RuntimeError> {
        let main_file = self
            .codegen
            .generate(&self.module.name, &self.source_dir)
            .await?;
        info!(path = %main_file.display(), "Built Go functions");
        Ok(())
    }

    async fn serve(
        &self,
        port: u16,
        admin_port: u16,
        envs: &EnvironmentVariables,
    ) -> Result<Box<dyn StopHandle>, RuntimeError> {
        self.launcher
            .start(&self.source_dir, port, admin_port, envs)
            .await
    }

    async fn discover_spec(
        &self,
        envs: &EnvironmentVariables,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredSpec, RuntimeError> {
        self.discoverer
            .discover(&self.source_dir, envs, cancel)
            .await
    }
}
