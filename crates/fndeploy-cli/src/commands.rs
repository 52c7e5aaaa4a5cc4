//! Main commands enum and primary subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Print the functions spec of a source directory as JSON
    Discover {
        #[command(flatten)]
        source: SourceArgs,

        #[command(flatten)]
        env: EnvArgs,
    },

    /// Generate the server entry point (autogen/main.go)
    Build {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Run the functions locally until interrupted
    Serve {
        #[command(flatten)]
        source: SourceArgs,

        /// Port the functions listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,

        /// Port of the admin endpoints
        #[arg(long, default_value = "8081")]
        admin_port: u16,

        #[command(flatten)]
        env: EnvArgs,
    },

    /// List supported Go versions and their runtime identifiers
    Runtimes,
}

/// Source directory selection shared by the source commands.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Directory containing go.mod
    #[arg(value_name = "SOURCE_DIR", default_value = ".")]
    pub source_dir: PathBuf,

    /// Use this runtime (e.g. go121) instead of the go.mod version
    #[arg(long)]
    pub runtime: Option<String>,

    /// Project the functions belong to
    #[arg(long, env = "GCLOUD_PROJECT")]
    pub project: Option<String>,
}

/// Environment given to the functions.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Environment variable for the functions (repeatable)
    #[arg(short = 'e', long = "env", value_name = "KEY=VALUE")]
    pub vars: Vec<String>,

    /// Dotenv file with environment variables for the functions
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use crate::parser::Cli;
    use clap::Parser;

    use super::*;

    #[test]
    fn test_discover_args() {
        let cli = Cli::parse_from([
            "fndeploy",
            "discover",
            "./functions",
            "--runtime",
            "go121",
            "-e",
            "A=1",
            "--env",
            "B=2",
            "--env-file",
            ".env.local",
        ]);

        let Some(Commands::Discover { source, env }) = cli.command else {
            panic!("expected discover");
        };
        assert_eq!(source.source_dir, PathBuf::from("./functions"));
        assert_eq!(source.runtime.as_deref(), Some("go121"));
        assert_eq!(env.vars, vec!["A=1", "B=2"]);
        assert_eq!(env.env_file, Some(PathBuf::from(".env.local")));
    }

    #[test]
    fn test_serve_defaults() {
        let cli = Cli::parse_from(["fndeploy", "serve"]);
        let Some(Commands::Serve {
            source,
            port,
            admin_port,
            ..
        }) = cli.command
        else {
            panic!("expected serve");
        };
        assert_eq!(source.source_dir, PathBuf::from("."));
        assert_eq!(port, 8080);
        assert_eq!(admin_port, 8081);
    }
}
