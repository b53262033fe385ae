pub mod config;
mod cli;
mod environment;
mod executor;
mod ops;
mod prompt;
mod registry;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use cli::{Cli, Commands};
use executor::selector::{local_executor, select_executor_for_host};
use prompt::{AssumeYes, Prompt, StdinPrompt};
use registry::Registry;

fn main() {
    if let Err(err) = run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "stagecoach=debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose >= 2)
        .init();
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    tracing::trace!("args: {:?}", std::env::args().collect::<Vec<_>>());

    if let Commands::Version = cli.command {
        ops::do_version();
        return Ok(());
    }

    let settings = Arc::new(
        config::load(&cli.config)
            .with_context(|| format!("cannot load configuration '{}'", cli.config.display()))?,
    );
    let hosts = if cli.hosts.is_empty() {
        settings.hosts.clone()
    } else {
        cli.hosts.clone()
    };
    let prompt: Box<dyn Prompt> = if cli.yes {
        Box::new(AssumeYes)
    } else {
        Box::new(StdinPrompt)
    };
    let local = local_executor();

    match cli.command {
        Commands::Deploy { variant } => {
            ops::for_each_host(
                &settings,
                &hosts,
                select_executor_for_host,
                local.as_ref(),
                prompt.as_ref(),
                |session| ops::do_deploy(session, variant),
            )?;
        }
        Commands::ClearCache { variant } => {
            ops::for_each_host(
                &settings,
                &hosts,
                select_executor_for_host,
                local.as_ref(),
                prompt.as_ref(),
                |session| ops::do_clear_cache(session, variant),
            )?;
        }
        Commands::FetchData { variant } => {
            ops::fetch_data(
                &settings,
                &hosts,
                select_executor_for_host,
                local.as_ref(),
                prompt.as_ref(),
                variant,
            )?;
        }
        Commands::DbConf { variant } => {
            ops::for_each_host(
                &settings,
                &hosts,
                select_executor_for_host,
                local.as_ref(),
                prompt.as_ref(),
                |session| ops::do_db_conf(session, variant),
            )?;
        }
        Commands::Envs => {
            ops::do_envs(&Registry::build(settings.clone()))?;
        }
        Commands::Version => ops::do_version(),
    }

    Ok(())
}
