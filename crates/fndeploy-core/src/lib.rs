//! Core domain types and port definitions for fndeploy.
//!
//! This crate holds everything a runtime delegate needs to describe *what*
//! it works with (modules, runtime identifiers, discovered specs, settings)
//! and the traits it is wired through. It contains no process, filesystem
//! or network code; those live in `fndeploy-runtime`.
#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod error;
pub mod ports;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    CallableTriggerSpec, DiscoveredSpec, Endpoint, EnvironmentVariables, EventTriggerSpec,
    HttpsTriggerSpec, Module, RequiredApi, RuntimeIdentifier, SPEC_VERSION, ScheduleTriggerSpec,
    SpecError, TaskQueueTriggerSpec, Trigger,
};
pub use error::{ConfigError, ProcessError, RuntimeError};
pub use ports::{DelegateContext, RuntimeDelegate, ServerLauncher, SpecProbe, StopHandle, StopOutcome};
pub use settings::{
    DEFAULT_BASE_PORT, DEFAULT_CODEGEN_PACKAGE, DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT_SECS,
    DEFAULT_SHUTDOWN_GRACE_SECS, ProbeTarget, Settings, SettingsError, validate_settings,
};
