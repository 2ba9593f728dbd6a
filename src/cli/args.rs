//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// datacache - reactive data cache
///
/// Fetches paths through configured data sources, caches them with
/// per-source expiration and persists selected entries between runs.
#[derive(Parser, Debug)]
#[command(name = "datacache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DATACACHE_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch one or more paths and print their values
    Get(GetArgs),

    /// Poll a path and report each change
    Watch(WatchArgs),

    /// Inspect or clear the persisted snapshot
    Snapshot(SnapshotArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the get command
#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Paths to fetch, optionally prefixed with a protocol (e.g. cloud:me/settings)
    #[arg(required = true)]
    pub paths: Vec<String>,

    /// Serve only cached or local data, never touch the network
    #[arg(long)]
    pub offline: bool,

    /// Print compact JSON instead of pretty JSON
    #[arg(long)]
    pub compact: bool,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Path to watch
    pub path: String,

    /// Seconds between refreshes
    #[arg(short, long, default_value = "5")]
    pub interval: u64,

    /// Stop after this many refreshes (runs until interrupted if unset)
    #[arg(short, long)]
    pub times: Option<u32>,
}

/// Arguments for the snapshot command
#[derive(Parser, Debug)]
pub struct SnapshotArgs {
    #[command(subcommand)]
    pub action: Option<SnapshotAction>,
}

/// Snapshot actions
#[derive(Subcommand, Debug)]
pub enum SnapshotAction {
    /// List persisted entries
    Show,

    /// Remove all persisted entries
    Clear,

    /// Show the snapshot file path
    Path,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(short, long)]
        force: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_get() {
        let cli = Cli::parse_from(["datacache", "get", "cloud:me/settings", "local:x", "--offline"]);
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.paths, vec!["cloud:me/settings", "local:x"]);
                assert!(args.offline);
                assert!(!args.compact);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn parse_watch_defaults() {
        let cli = Cli::parse_from(["datacache", "-vv", "watch", "me/profile"]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Watch(args) => {
                assert_eq!(args.interval, 5);
                assert_eq!(args.times, None);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
