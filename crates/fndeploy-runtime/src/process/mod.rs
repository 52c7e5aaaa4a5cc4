//! Process management infrastructure for runtime delegates.
//!
//! # Structure
//!
//! - `ProcessRunner` / `ChildProcess` - spawning, run-to-completion, handles
//! - `PortAllocator` - free local TCP ports
//! - `shutdown_child` - grace period then forced kill of a process group
//! - `spawn_stream_reader` - forwards child output to tracing

mod ports;
mod runner;
pub mod shutdown;
mod stream;

pub use ports::{PORT_SCAN_WINDOW, PortAllocator, is_port_available};
pub use runner::{ChildProcess, CommandOutput, ProcessRunner, SpawnOptions, StdioMode};
pub use shutdown::{Shutdown, shutdown_child};
pub(crate) use stream::spawn_stream_reader;

#[cfg(test)]
pub(crate) use ports::free_base_port;
