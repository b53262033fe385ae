use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::deploy::Variant;

/// stagecoach: deploy a Django project and move its data between environments
#[derive(Parser, Debug)]
#[command(name = "stagecoach", version, about = "Deploy a Django project to stage/live and copy data between environments.", long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Hosts to run against, as user@host[:port] (comma separated; overrides HOSTS)
    #[arg(short = 'H', long = "hosts", value_delimiter = ',', global = true)]
    pub hosts: Vec<String>,

    /// Path to the deployment configuration
    #[arg(short = 'c', long = "config", default_value = crate::config::DEFAULT_CONFIG_FILE, global = true)]
    pub config: PathBuf,

    /// Answer yes to every confirmation prompt
    #[arg(short = 'y', long = "yes", global = true)]
    pub yes: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Pull the latest code, refresh or back up data, migrate and reload
    Deploy {
        /// Environment to deploy (stage or live)
        variant: Variant,
    },

    /// Clear the database cache by invoking cache_clear
    ClearCache {
        /// Environment to clear (stage or live)
        variant: Variant,
    },

    /// Copy the database, and optionally uploads, from an environment to the local checkout
    FetchData {
        /// Environment to copy from (stage or live)
        variant: Variant,
    },

    /// Show the configured environments and their paths
    Envs,

    /// Show the database settings of an environment
    DbConf {
        /// Environment to inspect (stage or live)
        variant: Variant,
    },

    /// Print CLI version
    Version,
}
