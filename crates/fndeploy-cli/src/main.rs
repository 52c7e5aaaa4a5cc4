//! CLI entry point - the composition root.

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use fndeploy_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(cli).await {
        let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
        eprintln!("Error: {err:#}");
        std::process::exit(code);
    }
}

/// Logs go to stderr so command output on stdout stays machine readable.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = CliConfig::load(&cli.settings.to_settings())?;
    let ctx = bootstrap(config);

    match command {
        Commands::Discover { source, env } => {
            handlers::discover::execute(&ctx, &source, &env).await?;
        }
        Commands::Build { source } => {
            handlers::build::execute(&ctx, &source).await?;
        }
        Commands::Serve {
            source,
            port,
            admin_port,
            env,
        } => {
            handlers::serve::execute(&ctx, &source, port, admin_port, &env).await?;
        }
        Commands::Runtimes => handlers::runtimes::execute(),
    }

    Ok(())
}
