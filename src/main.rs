//! datacache - reactive data cache
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use datacache::cli::{Cli, Commands};
use datacache::config::ConfigManager;
use datacache::error::CacheResult;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

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

async fn run() -> CacheResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    // 0 = warn, 1 = info, 2+ = debug
    let filter = match cli.verbose {
        0 => EnvFilter::new("datacache=warn"),
        1 => EnvFilter::new("datacache=info"),
        _ => EnvFilter::new("datacache=debug"),
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);
    if config.general.log_format == "json" {
        subscriber.json().init();
    } else {
        subscriber.without_time().init();
    }

    datacache::ui::init_theme();

    match cli.command {
        Commands::Get(args) => datacache::cli::commands::get(args, &config).await,
        Commands::Watch(args) => datacache::cli::commands::watch(args, &config).await,
        Commands::Snapshot(args) => datacache::cli::commands::snapshot(args, &config).await,
        Commands::Config(args) => {
            datacache::cli::commands::config(args, &config, &config_manager).await
        }
    }
}
