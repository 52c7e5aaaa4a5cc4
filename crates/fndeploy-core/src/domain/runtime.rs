//! Supported execution environments.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Identifier of a supported Go execution environment.
///
/// The set is closed: a declared toolchain version either maps to exactly
/// one variant or is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeIdentifier {
    Go113,
    Go116,
    Go118,
    Go119,
    Go120,
    Go121,
}

impl RuntimeIdentifier {
    /// Every supported runtime, oldest first.
    pub const ALL: [Self; 6] = [
        Self::Go113,
        Self::Go116,
        Self::Go118,
        Self::Go119,
        Self::Go120,
        Self::Go121,
    ];

    /// Map a declared toolchain version (`go` directive) to a runtime.
    ///
    /// Patch components are ignored, so `1.21.4` resolves like `1.21`.
    pub fn from_go_version(version: &str) -> Result<Self, ConfigError> {
        let declared = version.trim();
        let mut parts = declared.split('.');
        let key = match (parts.next(), parts.next()) {
            (Some(major), Some(minor)) => format!("{major}.{minor}"),
            _ => declared.to_string(),
        };

        match key.as_str() {
            "1.13" => Ok(Self::Go113),
            "1.16" => Ok(Self::Go116),
            "1.18" => Ok(Self::Go118),
            "1.19" => Ok(Self::Go119),
            "1.20" => Ok(Self::Go120),
            "1.21" => Ok(Self::Go121),
            _ => Err(ConfigError::UnsupportedVersion {
                version: declared.to_string(),
                supported: Self::supported_versions(),
            }),
        }
    }

    /// The declared toolchain version this runtime is keyed by.
    pub const fn go_version(self) -> &'static str {
        match self {
            Self::Go113 => "1.13",
            Self::Go116 => "1.16",
            Self::Go118 => "1.18",
            Self::Go119 => "1.19",
            Self::Go120 => "1.20",
            Self::Go121 => "1.21",
        }
    }

    /// Canonical identifier string, e.g. `go121`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Go113 => "go113",
            Self::Go116 => "go116",
            Self::Go118 => "go118",
            Self::Go119 => "go119",
            Self::Go120 => "go120",
            Self::Go121 => "go121",
        }
    }

    /// All toolchain versions accepted by [`Self::from_go_version`].
    pub fn supported_versions() -> Vec<String> {
        Self::ALL
            .iter()
            .map(|runtime| runtime.go_version().to_string())
            .collect()
    }
}

impl fmt::Display for RuntimeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuntimeIdentifier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|runtime| runtime.as_str() == s.trim())
            .ok_or_else(|| ConfigError::UnknownRuntime(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_supported_version_maps_to_its_runtime() {
        for runtime in RuntimeIdentifier::ALL {
            let resolved = RuntimeIdentifier::from_go_version(runtime.go_version()).unwrap();
            assert_eq!(resolved, runtime);
        }
    }

    #[test]
    fn go_113_resolves() {
        assert_eq!(
            RuntimeIdentifier::from_go_version("1.13").unwrap(),
            RuntimeIdentifier::Go113
        );
    }

    #[test]
    fn patch_version_is_ignored() {
        assert_eq!(
            RuntimeIdentifier::from_go_version("1.21.4").unwrap(),
            RuntimeIdentifier::Go121
        );
    }

    #[test]
    fn unsupported_version_lists_supported_versions() {
        let err = RuntimeIdentifier::from_go_version("9.99").unwrap_err();
        match &err {
            ConfigError::UnsupportedVersion { version, supported } => {
                assert_eq!(version, "9.99");
                assert!(supported.iter().any(|v| v == "1.13"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let message = err.to_string();
        assert!(message.contains("9.99"));
        assert!(message.contains("1.13"));
    }

    #[test]
    fn single_component_version_is_rejected() {
        assert!(RuntimeIdentifier::from_go_version("1").is_err());
    }

    #[test]
    fn parses_identifier_form() {
        assert_eq!(
            "go118".parse::<RuntimeIdentifier>().unwrap(),
            RuntimeIdentifier::Go118
        );
        assert!(matches!(
            "nodejs18".parse::<RuntimeIdentifier>(),
            Err(ConfigError::UnknownRuntime(_))
        ));
    }

    #[test]
    fn serializes_as_identifier() {
        let json = serde_json::to_string(&RuntimeIdentifier::Go120).unwrap();
        assert_eq!(json, "\"go120\"");
        assert_eq!(RuntimeIdentifier::Go120.to_string(), "go120");
    }
}
