//! Port definitions (trait abstractions) for runtime delegates.
//!
//! Ports describe what the discovery flow expects from infrastructure
//! without naming processes, sockets or HTTP clients.
//!
//! # Design Rules
//!
//! - Intent-based methods (`start`, `stop`, `fetch`), not process plumbing
//! - Every implementation must be swappable for a test double

pub mod delegate;
pub mod launcher;
pub mod probe;

pub use delegate::{DelegateContext, RuntimeDelegate};
pub use launcher::{ServerLauncher, StopHandle, StopOutcome};
pub use probe::SpecProbe;
