use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file '{path}' not found")]
    NotFound { path: PathBuf },

    #[error("failed to read '{path}': {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("invalid configuration in '{path}': {source}")]
    Parse { path: PathBuf, source: serde_json::Error },

    #[error("{key} must not be empty")]
    Empty { key: &'static str },

    #[error("{key} must be an absolute path, got '{value}'")]
    NotAbsolute { key: &'static str, value: String },

    #[error("{key} must be a relative path, got '{value}'")]
    NotRelative { key: &'static str, value: String },
}

/// Deployment settings shared by every environment.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct DeployConfig {
    pub project_name: String,
    /// Absolute path holding one directory per environment.
    pub project_base_path: PathBuf,
    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: PathBuf,
    #[serde(default = "default_src_dir")]
    pub src_dir: PathBuf,
    #[serde(default)]
    pub cache_clear_models: Option<CacheModels>,
    #[serde(default)]
    pub hosts: Vec<String>,
    /// Run project commands through sudo as this user.
    #[serde(default)]
    pub run_as: Option<String>,
    /// Root of the local development checkout. Defaults to the config file's directory.
    #[serde(default)]
    pub local_root: Option<PathBuf>,
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_uploads_dir() -> PathBuf {
    Path::new("media").join("uploads")
}

fn default_src_dir() -> PathBuf {
    PathBuf::from("src")
}

/// Argument list for `manage.py cache_clear`, given either as one string or a list.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum CacheModels {
    Line(String),
    List(Vec<String>),
}

impl CacheModels {
    pub fn is_empty(&self) -> bool {
        match self {
            CacheModels::Line(s) => s.trim().is_empty(),
            CacheModels::List(items) => items.iter().all(|m| m.trim().is_empty()),
        }
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            CacheModels::Line(s) => s.split_whitespace().map(str::to_string).collect(),
            CacheModels::List(items) => items
                .iter()
                .map(|m| m.trim())
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .collect(),
        }
    }
}

impl DeployConfig {
    pub fn new(project_name: impl Into<String>, project_base_path: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            project_base_path: project_base_path.into(),
            backup_dir: default_backup_dir(),
            uploads_dir: default_uploads_dir(),
            src_dir: default_src_dir(),
            cache_clear_models: None,
            hosts: Vec::new(),
            run_as: None,
            local_root: None,
        }
    }

    /// True when a cache-clear command should be issued.
    pub fn wants_cache_clear(&self) -> bool {
        self.cache_clear_models
            .as_ref()
            .map(|m| !m.is_empty())
            .unwrap_or(false)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.project_name.trim().is_empty() {
            return Err(ConfigError::Empty { key: "PROJECT_NAME" });
        }
        if !self.project_base_path.is_absolute() {
            return Err(ConfigError::NotAbsolute {
                key: "PROJECT_BASE_PATH",
                value: self.project_base_path.display().to_string(),
            });
        }
        for (key, value) in [
            ("BACKUP_DIR", &self.backup_dir),
            ("UPLOADS_DIR", &self.uploads_dir),
            ("SRC_DIR", &self.src_dir),
        ] {
            if value.as_os_str().is_empty() {
                return Err(ConfigError::Empty { key });
            }
            if value.is_absolute() {
                return Err(ConfigError::NotRelative {
                    key,
                    value: value.display().to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Deployment target selectable from the command line.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    Stage,
    Live,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Stage, Variant::Live];

    pub fn as_str(&self) -> &'static str {
        match self {
            Variant::Stage => "stage",
            Variant::Live => "live",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stage" => Ok(Variant::Stage),
            "live" => Ok(Variant::Live),
            other => Err(format!("unknown environment '{}' (expected stage or live)", other)),
        }
    }
}
