//! Domain types shared by every runtime delegate.

mod module;
mod runtime;
mod spec;

use std::collections::BTreeMap;

pub use module::Module;
pub use runtime::RuntimeIdentifier;
pub use spec::{
    CallableTriggerSpec, DiscoveredSpec, Endpoint, EventTriggerSpec, HttpsTriggerSpec,
    RequiredApi, SPEC_VERSION, ScheduleTriggerSpec, SpecError, TaskQueueTriggerSpec, Trigger,
};

/// User-supplied environment variables, keyed by name.
///
/// Ordered so that anything derived from it (launch environments, printed
/// specs) is deterministic.
pub type EnvironmentVariables = BTreeMap<String, String>;
