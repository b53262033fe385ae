use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Attribute, Cell, Table, presets::UTF8_FULL};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::config::deploy::{DeployConfig, Variant};
use crate::environment::DbConf;
use crate::executor::{Executor, ShellCommand};
use crate::prompt::Prompt;
use crate::registry::Registry;
use crate::utils::io::local_download_path;
use crate::utils::shell::{quote, quote_path, transfer_host};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("no hosts given; pass -H user@host[:port] or set HOSTS")]
    NoHosts,

    #[error("use this with a single host ({count} given)")]
    NotSingleHost { count: usize },
}

/// Everything a workflow needs for one remote host.
pub struct Session<'a> {
    pub registry: &'a Registry,
    pub remote: &'a dyn Executor,
    pub local: &'a dyn Executor,
    pub prompt: &'a dyn Prompt,
}

/// Pull, refresh or back up data depending on the target, migrate and reload.
pub fn do_deploy(session: &Session, variant: Variant) -> Result<()> {
    let env = session.registry.get(variant)?;
    let exec = session.remote;

    env.pull_updates(exec)?;
    match variant {
        Variant::Stage => {
            let live = session.registry.get(Variant::Live)?;
            env.reset_data_from(live, exec, session.prompt)?;
        }
        Variant::Live => {
            if session.prompt.confirm("Backup database?")? {
                let file = env.backup_database(exec)?;
                println!("{} {}", "✔".green().bold(), format!("Database backed up to {}", file).green());
            }
            if session.prompt.confirm("Backup uploads?")? {
                let dir = env.backup_uploads(exec)?;
                println!("{} {}", "✔".green().bold(), format!("Uploads backed up to {}", dir).green());
            }
        }
    }
    env.migrate_database(exec)?;
    env.reload_process(exec)?;

    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Deployed '{}' on {}", variant, exec.host()).green()
    );
    Ok(())
}

pub fn do_clear_cache(session: &Session, variant: Variant) -> Result<()> {
    session.registry.get(variant)?.clear_cache(session.remote)
}

/// Copy a remote environment's database, and optionally its uploads, into the local checkout.
pub fn do_fetch_data(session: &Session, variant: Variant) -> Result<()> {
    let settings = session.registry.settings();
    let env = session.registry.get(variant)?;
    let project_dir = local_project_dir(settings);

    let (db_file, uploads_backup) = env.backup_data(session.remote)?;
    let local_db_file = local_download_path(&db_file);
    session
        .remote
        .fetch(&db_file, &local_db_file)
        .with_context(|| format!("failed to download database dump from '{}'", variant))?;

    if !session
        .prompt
        .confirm(&format!("Reset local database content from '{}'?", variant))?
    {
        return Ok(());
    }
    session.local.run(
        &ShellCommand::new("./manage.py db_clear --noinput").in_dir(&project_dir),
    )?;
    session.local.run(
        &ShellCommand::new(format!(
            "./manage.py db_load {} --noinput",
            quote_path(&local_db_file)
        ))
        .in_dir(&project_dir),
    )?;

    if session.prompt.confirm("Fetch uploads as well?")? {
        let host = transfer_host(session.remote.host());
        let line = format!(
            "rdiff-backup --force -r now {} {}",
            quote(&format!("{}::{}", host, uploads_backup)),
            quote_path(&project_dir.join(&settings.uploads_dir))
        );
        session
            .local
            .run(&ShellCommand::new(line).in_dir(&project_dir))?;
    }

    println!(
        "{} {}",
        "✔".green().bold(),
        format!("Fetched '{}' data into {}", variant, project_dir.display()).green()
    );
    Ok(())
}

fn local_project_dir(settings: &DeployConfig) -> PathBuf {
    settings
        .local_root
        .clone()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(&settings.src_dir)
        .join(&settings.project_name)
}

pub fn require_single_host(hosts: &[String]) -> Result<&str, HostError> {
    match hosts {
        [host] => Ok(host.as_str()),
        [] => Err(HostError::NoHosts),
        _ => Err(HostError::NotSingleHost { count: hosts.len() }),
    }
}

/// Run `task` against each host in turn with a fresh registry.
pub fn for_each_host<C, F>(
    settings: &Arc<DeployConfig>,
    hosts: &[String],
    connect: C,
    local: &dyn Executor,
    prompt: &dyn Prompt,
    mut task: F,
) -> Result<()>
where
    C: Fn(&str) -> Arc<dyn Executor>,
    F: FnMut(&Session) -> Result<()>,
{
    if hosts.is_empty() {
        return Err(HostError::NoHosts.into());
    }
    for host in hosts {
        tracing::debug!(host = %host, "connecting");
        let remote = connect(host);
        let registry = Registry::build(settings.clone());
        let session = Session {
            registry: &registry,
            remote: remote.as_ref(),
            local,
            prompt,
        };
        task(&session)?;
    }
    Ok(())
}

pub fn fetch_data<C>(
    settings: &Arc<DeployConfig>,
    hosts: &[String],
    connect: C,
    local: &dyn Executor,
    prompt: &dyn Prompt,
    variant: Variant,
) -> Result<()>
where
    C: Fn(&str) -> Arc<dyn Executor>,
{
    let host = require_single_host(hosts)?;
    let remote = connect(host);
    let registry = Registry::build(settings.clone());
    do_fetch_data(
        &Session {
            registry: &registry,
            remote: remote.as_ref(),
            local,
            prompt,
        },
        variant,
    )
}

pub fn do_envs(registry: &Registry) -> Result<()> {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec![
            Cell::new("Name").add_attribute(Attribute::Bold),
            Cell::new("Path").add_attribute(Attribute::Bold),
            Cell::new("Project").add_attribute(Attribute::Bold),
            Cell::new("Backups").add_attribute(Attribute::Bold),
            Cell::new("Uploads").add_attribute(Attribute::Bold),
        ]);
    for (_, env) in registry.iter() {
        table.add_row(vec![
            Cell::new(env.name()),
            Cell::new(env.path().display()),
            Cell::new(env.project_dir().display()),
            Cell::new(env.backup_dir().display()),
            Cell::new(env.uploads_dir().display()),
        ]);
    }
    println!("{}", table);

    let settings = registry.settings();
    if !settings.wants_cache_clear() {
        println!("{} {}", "i".yellow().bold(), "CACHE_CLEAR_MODELS is empty".yellow());
    }
    Ok(())
}

pub fn do_db_conf(session: &Session, variant: Variant) -> Result<()> {
    let env = session.registry.get(variant)?;
    let conf = env.db_conf(session.remote)?;
    println!("{} {}", format!("[{}]", session.remote.host()).bold(), env.name().cyan());
    println!("{}", db_conf_table(conf));
    Ok(())
}

fn db_conf_table(conf: &DbConf) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Setting", "Value"]);
    let password = if conf.password.is_empty() { "" } else { "********" };
    for (key, value) in [
        ("engine", conf.engine.as_str()),
        ("db_name", conf.db_name.as_str()),
        ("user", conf.user.as_str()),
        ("password", password),
        ("host", conf.host.as_str()),
        ("port", conf.port.as_str()),
    ] {
        table.add_row(vec![key, value]);
    }
    table
}

pub fn do_version() {
    println!("{} {}", "stagecoach".bold(), env!("CARGO_PKG_VERSION").cyan());
}
