mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Setup tracing based on verbosity and the configured level
    let configured = config::load(&cli.global).ok().map(|c| c.log_level);
    init_tracing(cli.global.verbose, configured.as_deref());

    // Dispatch and handle errors with proper exit codes
    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

fn init_tracing(verbosity: u8, configured: Option<&str>) {
    let filter = match verbosity {
        0 => match configured {
            Some("silly") => "trace",
            Some(level) => level,
            None => "warn",
        },
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands work without a valid configuration
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        // Shell completions generation
        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "matterhub", &mut std::io::stdout());
            Ok(())
        }

        // All other commands operate on the configured storage
        cmd => {
            let cfg = config::load(&cli.global)?;
            tracing::debug!(command = ?cmd, storage = %cfg.storage_path().display(), "dispatching command");
            commands::dispatch(cmd, &cfg, &cli.global).await
        }
    }
}
