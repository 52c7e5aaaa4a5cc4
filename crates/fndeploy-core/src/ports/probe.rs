//! Spec probe port.

use async_trait::async_trait;

use crate::domain::DiscoveredSpec;
use crate::error::RuntimeError;

/// Asks a running server to describe its own functions.
#[async_trait]
pub trait SpecProbe: Send + Sync {
    /// Fetch the spec from the server listening on `port`.
    ///
    /// Implementations wait for the server to come up, bounded by their own timeout.
    async fn fetch(&self, port: u16) -> Result<DiscoveredSpec, RuntimeError>;
}
