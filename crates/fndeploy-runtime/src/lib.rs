//! Process runtime for fndeploy delegates.
//!
//! Implements the ports declared in `fndeploy-core` on top of real OS
//! processes and HTTP: manifest parsing, entry point generation, server
//! launch and shutdown, and spec discovery. [`GolangDelegate`] ties them
//! together for Go sources.
#![deny(unsafe_code)]

pub mod codegen;
pub mod discovery;
pub mod golang;
pub mod launcher;
pub mod manifest;
pub mod probe;
pub mod process;

use fndeploy_core::{DelegateContext, RuntimeDelegate, RuntimeError, Settings};

pub use codegen::{AUTOGEN_DIR, CodeGenerator, MAIN_FILE};
pub use discovery::{SPEC_FILE, SpecDiscoverer, read_static_spec, with_running_server};
pub use golang::{GolangDelegate, resolve_runtime};
pub use launcher::{GoServerLauncher, ServerCommand, ServerGuard, layered_environment};
pub use manifest::{MANIFEST_FILE, parse_module, read_module};
pub use probe::{HttpSpecProbe, SPEC_PATH, parse_spec};
pub use process::{PortAllocator, ProcessRunner};

/// Find the delegate that handles `ctx`, if any.
///
/// Go is the only runtime implemented here; other sources yield `Ok(None)`.
pub async fn delegate_for(
    ctx: &DelegateContext,
    settings: &Settings,
) -> Result<Option<Box<dyn RuntimeDelegate>>, RuntimeError> {
    let delegate = GolangDelegate::try_create_with(ctx, settings).await?;
    Ok(delegate.map(|d| Box::new(d) as Box<dyn RuntimeDelegate>))
}
