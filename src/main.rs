//! vulcan-mutations CLI entry point
//!
//! Dispatches to subcommands.

use clap::Parser;
use console::style;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use vulcan_mutations::cli::{Cli, Commands};
use vulcan_mutations::config::{Config, ConfigManager};
use vulcan_mutations::error::{MutationError, MutationResult};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> MutationResult<()> {
    let cli = Cli::parse();

    // `config` subcommands may target a file that does not exist yet.
    if let Some(path) = &cli.config {
        if !path.exists() && !matches!(cli.command, Commands::Config(_)) {
            return Err(MutationError::ConfigNotFound(path.clone()));
        }
    }

    let config_manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };

    let local_config_path = if cli.no_local {
        None
    } else {
        let cwd = std::env::current_dir()
            .map_err(|e| MutationError::io("getting current directory", e))?;
        ConfigManager::find_local_config(&cwd)
    };

    let config = config_manager
        .load_merged(local_config_path.as_deref())
        .await?;

    init_logging(cli.verbose, &config);
    if let Some(path) = &local_config_path {
        debug!("Found local config: {}", path.display());
    }

    match cli.command {
        Commands::Build(args) => vulcan_mutations::cli::commands::build(args, &config).await,
        Commands::Apply(args) => vulcan_mutations::cli::commands::apply(args, &config).await,
        Commands::Mutate(args) => vulcan_mutations::cli::commands::mutate(args, &config).await,
        Commands::Collections(args) => {
            vulcan_mutations::cli::commands::collections(args, &config).await
        }
        Commands::Config(args) => {
            vulcan_mutations::cli::commands::config(args, &config, cli.config).await
        }
    }
}

/// 0 = warn, 1 = info, 2+ = debug; `general.verbose` counts as one level
fn init_logging(verbose: u8, config: &Config) {
    let level = verbose.max(u8::from(config.general.verbose));
    let filter = match level {
        0 => EnvFilter::new("vulcan_mutations=warn"),
        1 => EnvFilter::new("vulcan_mutations=info"),
        _ => EnvFilter::new("vulcan_mutations=debug"),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr);

    if config.general.log_format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}
