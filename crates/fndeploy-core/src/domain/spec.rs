//! Declarative description of deployable functions.
//!
//! A `DiscoveredSpec` is what a delegate hands back to the deploy pipeline:
//! the endpoints the source exposes, the APIs they need and the environment
//! they run with. It is read either from a static `functions.yaml` next to
//! the sources or from a running server's self-description. Both are the
//! same document, so one set of serde types covers YAML and JSON input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

use super::EnvironmentVariables;

/// The only manifest schema version understood by this crate.
pub const SPEC_VERSION: &str = "v1alpha1";

/// Platform assumed when an endpoint does not name one.
const DEFAULT_PLATFORM: &str = "gcfv2";

/// Validation failures for a discovered spec.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    #[error("unsupported specVersion \"{0}\" (expected {expected})", expected = SPEC_VERSION)]
    UnsupportedVersion(String),

    #[error("endpoint \"{0}\" has no entryPoint")]
    MissingEntryPoint(String),

    #[error("endpoint \"{0}\" has a schedule trigger without a schedule")]
    MissingSchedule(String),

    #[error("endpoint \"{0}\" has an event trigger without an eventType")]
    MissingEventType(String),
}

/// The declarative spec produced by discovery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredSpec {
    #[serde(default = "default_spec_version")]
    pub spec_version: String,

    #[serde(default)]
    pub endpoints: BTreeMap<String, Endpoint>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_apis: Vec<RequiredApi>,

    /// Parameter declarations, passed through untouched.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<serde_json::Value>,

    /// Environment the endpoints run with. Overwritten by the discoverer
    /// with the caller's view after acquisition.
    #[serde(default)]
    pub environment_variables: EnvironmentVariables,
}

impl Default for DiscoveredSpec {
    fn default() -> Self {
        Self {
            spec_version: default_spec_version(),
            endpoints: BTreeMap::new(),
            required_apis: Vec::new(),
            params: Vec::new(),
            environment_variables: EnvironmentVariables::new(),
        }
    }
}

impl DiscoveredSpec {
    /// Add an endpoint under the given id.
    #[must_use]
    pub fn with_endpoint(mut self, id: impl Into<String>, endpoint: Endpoint) -> Self {
        self.endpoints.insert(id.into(), endpoint);
        self
    }

    /// Check the spec for structural problems the deploy pipeline cannot recover from.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.spec_version != SPEC_VERSION {
            return Err(SpecError::UnsupportedVersion(self.spec_version.clone()));
        }

        for (id, endpoint) in &self.endpoints {
            if endpoint.entry_point.trim().is_empty() {
                return Err(SpecError::MissingEntryPoint(id.clone()));
            }
            match &endpoint.trigger {
                Trigger::ScheduleTrigger(schedule) if schedule.schedule.trim().is_empty() => {
                    return Err(SpecError::MissingSchedule(id.clone()));
                }
                Trigger::EventTrigger(event) if event.event_type.trim().is_empty() => {
                    return Err(SpecError::MissingEventType(id.clone()));
                }
                _ => {}
            }
        }

        Ok(())
    }
}

/// A single deployable function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub entry_point: String,

    #[serde(default = "default_platform")]
    pub platform: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub region: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub available_memory_mb: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_instances: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_instances: Option<u32>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    #[serde(flatten)]
    pub trigger: Trigger,
}

impl Endpoint {
    /// An HTTPS endpoint with default settings.
    pub fn https(entry_point: impl Into<String>) -> Self {
        Self {
            entry_point: entry_point.into(),
            platform: default_platform(),
            region: Vec::new(),
            available_memory_mb: None,
            timeout_seconds: None,
            min_instances: None,
            max_instances: None,
            labels: BTreeMap::new(),
            trigger: Trigger::HttpsTrigger(HttpsTriggerSpec::default()),
        }
    }
}

/// How an endpoint is invoked. Exactly one trigger key appears per endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    HttpsTrigger(HttpsTriggerSpec),
    CallableTrigger(CallableTriggerSpec),
    EventTrigger(EventTriggerSpec),
    ScheduleTrigger(ScheduleTriggerSpec),
    TaskQueueTrigger(TaskQueueTriggerSpec),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpsTriggerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invoker: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallableTriggerSpec {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventTriggerSpec {
    pub event_type: String,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub event_filters: BTreeMap<String, String>,

    #[serde(default)]
    pub retry: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTriggerSpec {
    pub schedule: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskQueueTriggerSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invoker: Vec<String>,
}

/// A Google API the deployed functions depend on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredApi {
    pub api: String,
    #[serde(default)]
    pub reason: String,
}

fn default_spec_version() -> String {
    SPEC_VERSION.to_string()
}

fn default_platform() -> String {
    DEFAULT_PLATFORM.to_string()
}
