//! Backstroke poller - periodic change detection for fork sync links.

use anyhow::Context;
use backstroke_cli::commands;
use backstroke_cli::{Cli, Command, Settings};
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Log to stderr so `once` and `status` output stays clean on stdout
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(&cli).context("invalid configuration")?;

    match cli.command {
        None | Some(Command::Run) => {
            commands::execute_run(&settings)
                .await
                .context("poller stopped")?;
        }
        Some(Command::Once) => {
            commands::execute_once(&settings).await?;
        }
        Some(Command::Status(args)) => {
            commands::execute_status(&args, &settings).await?;
        }
        Some(Command::Report(args)) => {
            commands::execute_report(&args, &settings).await?;
        }
    }

    Ok(())
}
