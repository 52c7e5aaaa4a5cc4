//! Delegate settings and validation.
//!
//! All fields are optional so that partially specified sources (environment,
//! CLI flags) can be layered; the `effective_*` accessors supply defaults.

use serde::{Deserialize, Serialize};

/// First port tried when allocating server ports.
pub const DEFAULT_BASE_PORT: u16 = 8000;

/// Seconds a launched server gets to exit after the admin quit request.
pub const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

/// Seconds to keep polling a launched server for its spec.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Fixed port the spec probe targets unless configured otherwise.
pub const DEFAULT_PROBE_PORT: u16 = 8081;

/// Go package that generates the server entry point.
pub const DEFAULT_CODEGEN_PACKAGE: &str =
    "github.com/FirebaseExtended/firebase-functions-go/support/codegen";

const ENV_PREFIX: &str = "FNDEPLOY_";

/// Which port the spec probe queries on a launched server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeTarget {
    /// Always query this port, whatever was allocated.
    Fixed(u16),
    /// Query the primary port allocated for the launch.
    Allocated,
}

impl Default for ProbeTarget {
    fn default() -> Self {
        Self::Fixed(DEFAULT_PROBE_PORT)
    }
}

impl ProbeTarget {
    /// Resolve the port to probe given the allocated primary port.
    pub const fn resolve(self, allocated: u16) -> u16 {
        match self {
            Self::Fixed(port) => port,
            Self::Allocated => allocated,
        }
    }
}

/// Delegate settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// First port tried by the port allocator.
    pub base_port: Option<u16>,

    /// Grace period between the admin quit request and a forced kill.
    pub shutdown_grace_secs: Option<u64>,

    /// How long to poll a launched server for its spec.
    pub probe_timeout_secs: Option<u64>,

    /// Fixed port for the spec probe.
    pub probe_port: Option<u16>,

    /// Probe the allocated primary port instead of a fixed one.
    /// Takes precedence over `probe_port`.
    pub probe_allocated: Option<bool>,

    /// Go package invoked to generate the server entry point.
    pub codegen_package: Option<String>,
}

impl Settings {
    /// Create settings with every default filled in.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self {
            base_port: Some(DEFAULT_BASE_PORT),
            shutdown_grace_secs: Some(DEFAULT_SHUTDOWN_GRACE_SECS),
            probe_timeout_secs: Some(DEFAULT_PROBE_TIMEOUT_SECS),
            probe_port: Some(DEFAULT_PROBE_PORT),
            probe_allocated: Some(false),
            codegen_package: Some(DEFAULT_CODEGEN_PACKAGE.to_string()),
        }
    }

    /// Read settings from `FNDEPLOY_*` variables of the current process.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_vars(std::env::vars_os().filter_map(|(key, value)| {
            Some((key.into_string().ok()?, value.into_string().ok()?))
        }))
    }

    /// Read settings from an explicit set of variables.
    ///
    /// Unknown `FNDEPLOY_*` keys are ignored; malformed values are errors.
    pub fn from_vars<I>(vars: I) -> Result<Self, SettingsError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut settings = Self::default();
        for (key, value) in vars {
            let Some(name) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            match name {
                "BASE_PORT" => settings.base_port = Some(parse_value(&key, &value)?),
                "SHUTDOWN_GRACE_SECS" => {
                    settings.shutdown_grace_secs = Some(parse_value(&key, &value)?);
                }
                "PROBE_TIMEOUT_SECS" => {
                    settings.probe_timeout_secs = Some(parse_value(&key, &value)?);
                }
                "PROBE_PORT" => settings.probe_port = Some(parse_value(&key, &value)?),
                "PROBE_ALLOCATED" => settings.probe_allocated = Some(parse_value(&key, &value)?),
                "CODEGEN_PACKAGE" => settings.codegen_package = Some(value),
                _ => {}
            }
        }
        Ok(settings)
    }

    /// Overlay every field that is set in `other`.
    pub fn merge(&mut self, other: &Self) {
        if other.base_port.is_some() {
            self.base_port = other.base_port;
        }
        if other.shutdown_grace_secs.is_some() {
            self.shutdown_grace_secs = other.shutdown_grace_secs;
        }
        if other.probe_timeout_secs.is_some() {
            self.probe_timeout_secs = other.probe_timeout_secs;
        }
        if other.probe_port.is_some() {
            self.probe_port = other.probe_port;
        }
        if other.probe_allocated.is_some() {
            self.probe_allocated = other.probe_allocated;
        }
        if let Some(ref package) = other.codegen_package {
            self.codegen_package = Some(package.clone());
        }
    }

    #[must_use]
    pub fn effective_base_port(&self) -> u16 {
        self.base_port.unwrap_or(DEFAULT_BASE_PORT)
    }

    #[must_use]
    pub fn effective_shutdown_grace(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.shutdown_grace_secs
                .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
        )
    }

    #[must_use]
    pub fn effective_probe_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_secs(
            self.probe_timeout_secs
                .unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS),
        )
    }

    #[must_use]
    pub fn effective_codegen_package(&self) -> &str {
        self.codegen_package
            .as_deref()
            .unwrap_or(DEFAULT_CODEGEN_PACKAGE)
    }

    /// The probe target these settings select.
    #[must_use]
    pub fn probe_target(&self) -> ProbeTarget {
        if self.probe_allocated.unwrap_or(false) {
            ProbeTarget::Allocated
        } else {
            ProbeTarget::Fixed(self.probe_port.unwrap_or(DEFAULT_PROBE_PORT))
        }
    }
}

/// Settings validation error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    #[error("Port should be >= 1024 (privileged ports require root), got {0}")]
    InvalidPort(u16),

    #[error("Shutdown grace period must be between 1 and 300 seconds, got {0}")]
    InvalidGracePeriod(u64),

    #[error("Probe timeout must be between 1 and 600 seconds, got {0}")]
    InvalidProbeTimeout(u64),

    #[error("Codegen package cannot be empty")]
    EmptyCodegenPackage,

    #[error("Invalid value for {key}: \"{value}\"")]
    InvalidValue { key: String, value: String },
}

/// Validate settings values.
pub fn validate_settings(settings: &Settings) -> Result<(), SettingsError> {
    for port in [settings.base_port, settings.probe_port].into_iter().flatten() {
        if port < 1024 {
            return Err(SettingsError::InvalidPort(port));
        }
    }

    if let Some(grace) = settings.shutdown_grace_secs {
        if !(1..=300).contains(&grace) {
            return Err(SettingsError::InvalidGracePeriod(grace));
        }
    }

    if let Some(timeout) = settings.probe_timeout_secs {
        if !(1..=600).contains(&timeout) {
            return Err(SettingsError::InvalidProbeTimeout(timeout));
        }
    }

    if settings
        .codegen_package
        .as_ref()
        .is_some_and(|p| p.trim().is_empty())
    {
        return Err(SettingsError::EmptyCodegenPackage);
    }

    Ok(())
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SettingsError> {
    value
        .trim()
        .parse()
        .map_err(|_| SettingsError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_default_settings() {
        let settings = Settings::with_defaults();
        assert_eq!(settings.base_port, Some(DEFAULT_BASE_PORT));
        assert_eq!(settings.shutdown_grace_secs, Some(10));
        assert_eq!(settings.probe_target(), ProbeTarget::Fixed(DEFAULT_PROBE_PORT));
        assert!(validate_settings(&settings).is_ok());
    }

    #[test]
    fn test_effective_values_fall_back_to_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.effective_base_port(), DEFAULT_BASE_PORT);
        assert_eq!(settings.effective_shutdown_grace().as_secs(), 10);
        assert_eq!(settings.effective_probe_timeout().as_secs(), 30);
        assert_eq!(settings.effective_codegen_package(), DEFAULT_CODEGEN_PACKAGE);
    }

    #[test]
    fn test_from_vars_reads_prefixed_keys() {
        let settings = Settings::from_vars(vars(&[
            ("FNDEPLOY_BASE_PORT", "9100"),
            ("FNDEPLOY_SHUTDOWN_GRACE_SECS", "3"),
            ("FNDEPLOY_PROBE_ALLOCATED", "true"),
            ("FNDEPLOY_UNRELATED", "x"),
            ("PATH", "/usr/bin"),
        ]))
        .unwrap();

        assert_eq!(settings.base_port, Some(9100));
        assert_eq!(settings.shutdown_grace_secs, Some(3));
        assert_eq!(settings.probe_target(), ProbeTarget::Allocated);
        assert_eq!(settings.probe_timeout_secs, None);
    }

    #[test]
    fn test_from_vars_rejects_malformed_value() {
        let err = Settings::from_vars(vars(&[("FNDEPLOY_PROBE_PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, SettingsError::InvalidValue { .. }));
    }

    #[test]
    fn test_merge_overlays_set_fields_only() {
        let mut base = Settings::with_defaults();
        let overlay = Settings {
            probe_port: Some(9999),
            ..Default::default()
        };
        base.merge(&overlay);
        assert_eq!(base.probe_port, Some(9999));
        assert_eq!(base.base_port, Some(DEFAULT_BASE_PORT));
    }

    #[test]
    fn test_probe_target_resolution() {
        assert_eq!(ProbeTarget::Fixed(8081).resolve(9000), 8081);
        assert_eq!(ProbeTarget::Allocated.resolve(9000), 9000);
    }

    #[test]
    fn test_validate_port_too_low() {
        let settings = Settings {
            base_port: Some(80),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidPort(80))
        ));
    }

    #[test]
    fn test_validate_zero_grace() {
        let settings = Settings {
            shutdown_grace_secs: Some(0),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::InvalidGracePeriod(0))
        ));
    }

    #[test]
    fn test_validate_empty_package() {
        let settings = Settings {
            codegen_package: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            validate_settings(&settings),
            Err(SettingsError::EmptyCodegenPackage)
        ));
    }
}
