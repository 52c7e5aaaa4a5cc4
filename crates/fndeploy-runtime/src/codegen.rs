//! Server entry point generation.
//!
//! Functions written against the Go SDK have no `main` package of their own.
//! An external generator reads the user's module and prints a `main.go`
//! that registers every function and serves them over HTTP.

use std::path::{Path, PathBuf};

use fndeploy_core::{DEFAULT_CODEGEN_PACKAGE, ProcessError, RuntimeError};
use tracing::{debug, info};

use crate::process::{ProcessRunner, SpawnOptions};

/// Directory, relative to the source root, holding generated code.
pub const AUTOGEN_DIR: &str = "autogen";

/// Generated entry point inside [`AUTOGEN_DIR`].
pub const MAIN_FILE: &str = "main.go";

/// Runs the code generator and writes its output into the source tree.
#[derive(Debug, Clone)]
pub struct CodeGenerator {
    runner: ProcessRunner,
    program: String,
    args: Vec<String>,
}

impl Default for CodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_CODEGEN_PACKAGE)
    }
}

impl CodeGenerator {
    /// Generator invoked as `go run <package> <module>`.
    pub fn new(package: impl Into<String>) -> Self {
        Self::with_command("go", vec!["run".to_string(), package.into()])
    }

    /// Generator invoked as `<program> <args...> <module>`.
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            runner: ProcessRunner::new(),
            program: program.into(),
            args,
        }
    }

    /// Generate `autogen/main.go` for `module_name` under `working_dir`.
    ///
    /// Returns the path of the written file.
    pub async fn generate(
        &self,
        module_name: &str,
        working_dir: &Path,
    ) -> Result<PathBuf, RuntimeError> {
        let autogen = working_dir.join(AUTOGEN_DIR);
        match tokio::fs::create_dir(&autogen).await {
            Ok(()) => debug!(dir = %autogen.display(), "Created autogen directory"),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => return Err(RuntimeError::io(autogen, e)),
        }

        let mut args = self.args.clone();
        args.push(module_name.to_string());

        info!(module = %module_name, "Generating server entry point");
        let output = self
            .runner
            .run(
                &self.program,
                &args,
                &SpawnOptions::new().with_working_dir(working_dir),
            )
            .await?
            .check(&self.program)
            .map_err(|e| match e {
                ProcessError::NonZeroExit { code, stderr, .. } => {
                    RuntimeError::Codegen { code, stderr }
                }
                other => other.into(),
            })?;

        let main_file = autogen.join(MAIN_FILE);
        tokio::fs::write(&main_file, &output.stdout)
            .await
            .map_err(|e| RuntimeError::io(&main_file, e))?;

        debug!(
            path = %main_file.display(),
            bytes = output.stdout.len(),
            "Wrote generated entry point"
        );
        Ok(main_file)
    }
}
