use anyhow::{Context, Result};
use colored::*;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::config::deploy::DeployConfig;
use crate::executor::{Executor, ShellCommand};
use crate::prompt::Prompt;
use crate::utils::shell::{quote, quote_path};

/// Printed by `manage.py db_backup` in front of the dump location.
pub const BACKUP_MARKER: &str = "successfully backed up to:";

#[derive(Debug, Error)]
pub enum EnvError {
    #[error("[{host}] database backup did not report a location (no '{}' in output)", BACKUP_MARKER)]
    MissingBackupMarker { host: String, output: String },

    #[error("[{host}] database backup reported an empty location after '{}'", BACKUP_MARKER)]
    EmptyBackupLocation { host: String, output: String },

    #[error("[{host}] could not read database settings: {reason}")]
    BadSettings { host: String, reason: String },
}

/// Connection settings of an environment's Django database.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct DbConf {
    pub engine: String,
    pub db_name: String,
    pub user: String,
    pub password: String,
    pub host: String,
    pub port: String,
}

// Prints the default database settings as JSON, for both the old flat
// DATABASE_* settings and the DATABASES dict.
const DB_CONF_SNIPPET: &str = r#"import json
from django.conf import settings
d = getattr(settings, 'DATABASES', {}).get('default')
if d:
    c = dict(engine=d['ENGINE'].rsplit('.', 1)[-1], db_name=d['NAME'], user=d.get('USER'), password=d.get('PASSWORD'), host=d.get('HOST'), port=d.get('PORT'))
else:
    c = dict(engine=settings.DATABASE_ENGINE, db_name=settings.DATABASE_NAME, user=settings.DATABASE_USER, password=settings.DATABASE_PASSWORD, host=settings.DATABASE_HOST, port=settings.DATABASE_PORT)
print(json.dumps(dict((k, str(v or '')) for k, v in c.items())))"#;

/// One deployment target: a checkout of the project under `path`.
pub struct Environment {
    name: String,
    path: PathBuf,
    settings: Arc<DeployConfig>,
    db_conf: OnceCell<DbConf>,
}

impl Environment {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, settings: Arc<DeployConfig>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            settings,
            db_conf: OnceCell::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn src_dir(&self) -> PathBuf {
        self.path.join(&self.settings.src_dir)
    }

    pub fn project_dir(&self) -> PathBuf {
        self.src_dir().join(&self.settings.project_name)
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.path.join(&self.settings.backup_dir)
    }

    pub fn uploads_dir(&self) -> PathBuf {
        self.project_dir().join(&self.settings.uploads_dir)
    }

    pub fn uploads_backup_dir(&self) -> PathBuf {
        self.backup_dir()
            .join(format!("{}_{}_uploads", self.settings.project_name, self.name))
    }

    fn command(&self, dir: &Path, line: impl Into<String>) -> ShellCommand {
        ShellCommand::new(line)
            .in_dir(dir)
            .as_user(self.settings.run_as.as_deref())
    }

    fn manage(&self, args: &str) -> ShellCommand {
        self.command(&self.project_dir(), format!("./manage.py {}", args))
    }

    pub fn pull_updates(&self, exec: &dyn Executor) -> Result<()> {
        exec.run(&self.command(&self.src_dir(), "git pull"))?;
        Ok(())
    }

    pub fn migrate_database(&self, exec: &dyn Executor) -> Result<()> {
        exec.run(&self.manage("migrate"))?;
        Ok(())
    }

    /// Touch the WSGI file so the application server reloads the process.
    pub fn reload_process(&self, exec: &dyn Executor) -> Result<()> {
        exec.run(&self.command(&self.src_dir(), "touch app.wsgi"))?;
        Ok(())
    }

    pub fn clear_cache(&self, exec: &dyn Executor) -> Result<()> {
        let models = match &self.settings.cache_clear_models {
            Some(m) if !m.is_empty() => m.to_args(),
            _ => {
                println!(
                    "{} {}",
                    "i".yellow().bold(),
                    "CACHE_CLEAR_MODELS is empty, not clearing cache".yellow()
                );
                return Ok(());
            }
        };
        println!("{} {}", "i".yellow().bold(), "Clearing cache".yellow());
        let args: Vec<String> = models.iter().map(|m| quote(m).into_owned()).collect();
        exec.run(&self.manage(&format!("cache_clear {}", args.join(" "))))?;
        Ok(())
    }

    /// Dump the database under `backup_dir` and return the dump's path.
    pub fn backup_database(&self, exec: &dyn Executor) -> Result<String> {
        let prefix = self.backup_dir().join(format!(
            "db_backup_{}_{}",
            self.settings.project_name, self.name
        ));
        let out = exec.run(&self.manage(&format!("db_backup {}", quote_path(&prefix))))?;
        let path = match parse_backup_location(&out.output) {
            Some(p) if !p.is_empty() => p,
            Some(_) => {
                return Err(EnvError::EmptyBackupLocation {
                    host: exec.host().to_string(),
                    output: out.output,
                }
                .into());
            }
            None => {
                return Err(EnvError::MissingBackupMarker {
                    host: exec.host().to_string(),
                    output: out.output,
                }
                .into());
            }
        };
        tracing::debug!(env = %self.name, path = %path, "database backed up");
        Ok(path)
    }

    /// Mirror the uploads tree into `uploads_backup_dir` with rdiff-backup.
    pub fn backup_uploads(&self, exec: &dyn Executor) -> Result<String> {
        let target = self.uploads_backup_dir();
        let line = format!(
            "rdiff-backup {} {}",
            quote_path(&self.uploads_dir()),
            quote_path(&target)
        );
        exec.run(&ShellCommand::new(line).as_user(self.settings.run_as.as_deref()))?;
        Ok(target.to_string_lossy().into_owned())
    }

    pub fn backup_data(&self, exec: &dyn Executor) -> Result<(String, String)> {
        let db_file = self.backup_database(exec)?;
        let uploads = self.backup_uploads(exec)?;
        Ok((db_file, uploads))
    }

    pub fn load_database_from(&self, exec: &dyn Executor, db_file: &str) -> Result<()> {
        exec.run(&self.manage(&format!("db_load --noinput {}", quote(db_file))))?;
        Ok(())
    }

    pub fn clear_database(&self, exec: &dyn Executor) -> Result<()> {
        exec.run(&self.manage("db_clear --noinput"))?;
        Ok(())
    }

    /// Replace this environment's database and uploads with a copy of `other`'s.
    ///
    /// Each destructive half is confirmed first. A failure part way leaves the
    /// target as the last successful command left it; in particular the uploads
    /// may remain renamed to `<UPLOADS_DIR>.bak`.
    pub fn reset_data_from(
        &self,
        other: &Environment,
        exec: &dyn Executor,
        prompt: &dyn Prompt,
    ) -> Result<()> {
        if !prompt.confirm(&format!(
            "Reset database '{}' content from '{}'?",
            self.name, other.name
        ))? {
            println!("{} {}", "i".yellow().bold(), "Not resetting database content.".yellow());
            return Ok(());
        }

        self.clear_cache(exec)?;

        let db_file = other
            .backup_database(exec)
            .with_context(|| format!("failed to back up '{}' database", other.name))?;
        self.clear_database(exec)?;
        self.load_database_from(exec, &db_file)?;

        if !prompt.confirm(&format!(
            "Copy media files from '{}' to '{}'?",
            other.name, self.name
        ))? {
            println!("{} {}", "i".yellow().bold(), "Not copying media files.".yellow());
            return Ok(());
        }

        let project_dir = self.project_dir();
        let uploads = quote_path(&self.settings.uploads_dir);
        let backup = quote_path(&PathBuf::from(format!(
            "{}.bak",
            self.settings.uploads_dir.display()
        )));
        exec.run(&self.command(&project_dir, format!("mv {} {}", uploads, backup)))?;
        exec.run(&self.command(
            &project_dir,
            format!("cp -a {} {}", quote_path(&other.uploads_dir()), uploads),
        ))?;
        exec.run(&self.command(&project_dir, format!("rm -r {}", backup)))?;
        Ok(())
    }

    /// Database settings of this environment, read from Django once and cached.
    pub fn db_conf(&self, exec: &dyn Executor) -> Result<&DbConf> {
        if let Some(conf) = self.db_conf.get() {
            return Ok(conf);
        }
        let line = format!(
            "DJANGO_SETTINGS_MODULE=settings python -c {}",
            quote(DB_CONF_SNIPPET)
        );
        let out = exec.run(&self.command(&self.project_dir(), line).quiet())?;
        let conf = parse_db_conf(&out.output).map_err(|reason| EnvError::BadSettings {
            host: exec.host().to_string(),
            reason,
        })?;
        Ok(self.db_conf.get_or_init(|| conf))
    }
}

/// Text after the first `:` of a `db_backup` report, provided the report has the marker.
/// The text may be empty.
pub fn parse_backup_location(output: &str) -> Option<String> {
    if !output.contains(BACKUP_MARKER) {
        return None;
    }
    output
        .split_once(':')
        .map(|(_, rest)| rest.trim().to_string())
}

fn parse_db_conf(output: &str) -> std::result::Result<DbConf, String> {
    let json = output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with('{'))
        .ok_or_else(|| "no JSON in output".to_string())?;
    serde_json::from_str(json).map_err(|e| e.to_string())
}
