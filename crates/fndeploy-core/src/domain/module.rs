//! Parsed source module manifest.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A Go module as declared by its `go.mod` manifest.
///
/// Built once by the manifest parser and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    /// Module path from the `module` directive.
    pub name: String,
    /// Toolchain version from the `go` directive, verbatim.
    pub go_version: Option<String>,
    /// Required module paths mapped to their versions.
    pub requires: BTreeMap<String, String>,
    /// Replaced module paths mapped to their replacement target.
    pub replaces: BTreeMap<String, String>,
}

impl Module {
    /// Create a module with only a name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            go_version: None,
            requires: BTreeMap::new(),
            replaces: BTreeMap::new(),
        }
    }

    /// Set the declared toolchain version.
    #[must_use]
    pub fn with_go_version(mut self, version: impl Into<String>) -> Self {
        self.go_version = Some(version.into());
        self
    }

    /// Whether the module depends on the given module path.
    pub fn requires_module(&self, path: &str) -> bool {
        self.requires.contains_key(path)
    }
}
