//! Port allocation utilities for launched servers.

use fndeploy_core::ProcessError;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::time::sleep;
use tracing::debug;

/// Number of consecutive ports scanned from the base port.
pub const PORT_SCAN_WINDOW: u16 = 100;

const SWEEPS: u32 = 3;

/// Check if a port is available by attempting to bind to it.
/// The listener is dropped immediately, which releases the port.
pub async fn is_port_available(port: u16) -> bool {
    match TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => listener.local_addr().is_ok(),
        Err(_) => false,
    }
}

/// Hands out free local TCP ports.
///
/// Ports are probed by binding, then released, so nothing stops another
/// process from grabbing one before the server binds it. To keep two calls
/// made back to back from returning the same still-unbound port, the
/// allocator remembers what it handed out until [`Self::release`] is called.
#[derive(Debug)]
pub struct PortAllocator {
    base_port: u16,
    handed_out: Mutex<Vec<u16>>,
}

impl PortAllocator {
    pub const fn new(base_port: u16) -> Self {
        Self {
            base_port,
            handed_out: Mutex::new(Vec::new()),
        }
    }

    pub const fn base_port(&self) -> u16 {
        self.base_port
    }

    /// Allocate an available port.
    ///
    /// Makes a bounded number of sweeps over the scan window and fails with
    /// `ProcessError::NoFreePort` if every port stays taken.
    pub async fn allocate(&self) -> Result<u16, ProcessError> {
        let end = self.base_port.saturating_add(PORT_SCAN_WINDOW - 1);

        for attempt in 0..SWEEPS {
            for port in self.base_port..=end {
                if self.is_handed_out(port) {
                    continue;
                }

                if is_port_available(port).await && self.claim(port) {
                    debug!(port = %port, attempt = %(attempt + 1), "Allocated available port");
                    return Ok(port);
                }
            }

            if attempt + 1 < SWEEPS {
                sleep(Duration::from_millis(100)).await;
            }
        }

        Err(ProcessError::NoFreePort {
            start: self.base_port,
            end,
        })
    }

    /// Return a port so it can be handed out again.
    pub fn release(&self, port: u16) {
        self.ports().retain(|&p| p != port);
    }

    fn is_handed_out(&self, port: u16) -> bool {
        self.ports().contains(&port)
    }

    /// Record a port as handed out; false if a concurrent caller got it first.
    fn claim(&self, port: u16) -> bool {
        let mut ports = self.ports();
        if ports.contains(&port) {
            return false;
        }
        ports.push(port);
        true
    }

    fn ports(&self) -> std::sync::MutexGuard<'_, Vec<u16>> {
        self.handed_out
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

/// A base port the OS just reported free, for tests that need a scan window.
#[cfg(test)]
pub(crate) fn free_base_port() -> u16 {
    std::net::TcpListener::bind(("127.0.0.1", 0))
        .and_then(|listener| listener.local_addr())
        .map(|addr| addr.port())
        .expect("no ephemeral port")
}
