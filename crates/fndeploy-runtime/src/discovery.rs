//! Spec discovery for a function source directory.
//!
//! A static `functions.yaml` next to the sources wins. Without one, the
//! functions are started as a local server that describes itself over HTTP,
//! and the server is stopped again before discovery returns.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use fndeploy_core::{
    DiscoveredSpec, EnvironmentVariables, ProbeTarget, RuntimeError, ServerLauncher, Settings,
    SpecProbe, StopHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::launcher::GoServerLauncher;
use crate::probe::{HttpSpecProbe, parse_spec};
use crate::process::PortAllocator;

/// Static spec file name at the root of a source directory.
pub const SPEC_FILE: &str = "functions.yaml";

/// Read `<source_dir>/functions.yaml` if it exists.
pub async fn read_static_spec(source_dir: &Path) -> Result<Option<DiscoveredSpec>, RuntimeError> {
    let path = source_dir.join(SPEC_FILE);
    match tokio::fs::read_to_string(&path).await {
        Ok(text) => {
            info!(path = %path.display(), "Using static functions spec");
            parse_spec(&text, &path.display().to_string()).map(Some)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(RuntimeError::io(path, e)),
    }
}

/// Run `body` against a started server, then stop the server.
///
/// The server is stopped whatever `body` returns. The body's error wins over
/// a stop error; a stop error only surfaces when the body succeeded. If the
/// returned future is dropped early, the handle is dropped with it, which
/// kills the process.
pub async fn with_running_server<T, F>(
    handle: Box<dyn StopHandle>,
    body: F,
) -> Result<T, RuntimeError>
where
    F: Future<Output = Result<T, RuntimeError>>,
{
    let pid = handle.pid();
    let result = body.await;
    let stopped = handle.stop().await;

    match (result, stopped) {
        (Ok(value), Ok(outcome)) => {
            debug!(pid = ?pid, code = ?outcome.code, forced = outcome.forced, "Server stopped");
            Ok(value)
        }
        (Ok(_), Err(stop_error)) => Err(stop_error),
        (Err(error), Ok(outcome)) => {
            debug!(pid = ?pid, code = ?outcome.code, forced = outcome.forced, "Server stopped after failure");
            Err(error)
        }
        (Err(error), Err(stop_error)) => {
            warn!(pid = ?pid, error = %stop_error, "Failed to stop server");
            Err(error)
        }
    }
}

/// Ports handed out for one discovery, returned to the allocator on drop.
struct PortLease<'a> {
    allocator: &'a PortAllocator,
    ports: Vec<u16>,
}

impl<'a> PortLease<'a> {
    const fn new(allocator: &'a PortAllocator) -> Self {
        Self {
            allocator,
            ports: Vec::new(),
        }
    }

    async fn take(&mut self) -> Result<u16, RuntimeError> {
        let port = self.allocator.allocate().await?;
        self.ports.push(port);
        Ok(port)
    }
}

impl Drop for PortLease<'_> {
    fn drop(&mut self) {
        for port in self.ports.drain(..) {
            self.allocator.release(port);
        }
    }
}

/// Determines the deployable spec of a source directory.
pub struct SpecDiscoverer {
    ports: PortAllocator,
    launcher: Arc<dyn ServerLauncher>,
    probe: Arc<dyn SpecProbe>,
    probe_target: ProbeTarget,
}

impl std::fmt::Debug for SpecDiscoverer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecDiscoverer")
            .field("ports", &self.ports)
            .field("probe_target", &self.probe_target)
            .finish_non_exhaustive()
    }
}

impl SpecDiscoverer {
    pub fn new(
        ports: PortAllocator,
        launcher: Arc<dyn ServerLauncher>,
        probe: Arc<dyn SpecProbe>,
    ) -> Self {
        Self {
            ports,
            launcher,
            probe,
            probe_target: ProbeTarget::default(),
        }
    }

    /// Discoverer backed by the Go server launcher and the HTTP probe.
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            PortAllocator::new(settings.effective_base_port()),
            Arc::new(GoServerLauncher::from_settings(settings)),
            Arc::new(HttpSpecProbe::new(settings.effective_probe_timeout())),
        )
        .with_probe_target(settings.probe_target())
    }

    #[must_use]
    pub const fn with_probe_target(mut self, target: ProbeTarget) -> Self {
        self.probe_target = target;
        self
    }

    pub const fn probe_target(&self) -> ProbeTarget {
        self.probe_target
    }

    /// Discover the spec for `source_dir`.
    ///
    /// The returned spec's environment is always `envs`, whichever path
    /// produced it.
    pub async fn discover(
        &self,
        source_dir: &Path,
        envs: &EnvironmentVariables,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredSpec, RuntimeError> {
        if cancel.is_cancelled() {
            return Err(RuntimeError::Cancelled);
        }

        let mut spec = match read_static_spec(source_dir).await? {
            Some(spec) => spec,
            None => self.discover_from_server(source_dir, envs, cancel).await?,
        };

        spec.environment_variables = envs.clone();
        Ok(spec)
    }

    async fn discover_from_server(
        &self,
        source_dir: &Path,
        envs: &EnvironmentVariables,
        cancel: &CancellationToken,
    ) -> Result<DiscoveredSpec, RuntimeError> {
        let mut lease = PortLease::new(&self.ports);
        let port = lease.take().await?;
        let admin_port = lease.take().await?;
        let probe_port = self.probe_target.resolve(port);

        info!(
            dir = %source_dir.display(),
            port = %port,
            admin_port = %admin_port,
            probe_port = %probe_port,
            "Starting server to discover functions"
        );

        let handle = self
            .launcher
            .start(source_dir, port, admin_port, envs)
            .await?;

        with_running_server(handle, async {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    info!("Discovery cancelled, stopping server");
                    Err(RuntimeError::Cancelled)
                }
                result = self.probe.fetch(probe_port) => result,
            }
        })
        .await
    }
}
