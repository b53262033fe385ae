pub mod deploy;

use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

use deploy::{ConfigError, DeployConfig};

pub const DEFAULT_CONFIG_FILE: &str = "deploy.json";

/// Keys that may be supplied through the process environment instead of the file.
const ENV_KEYS: [&str; 9] = [
    "PROJECT_NAME",
    "PROJECT_BASE_PATH",
    "BACKUP_DIR",
    "UPLOADS_DIR",
    "SRC_DIR",
    "CACHE_CLEAR_MODELS",
    "HOSTS",
    "RUN_AS",
    "LOCAL_ROOT",
];

/// Load the configuration file (if present), apply environment overrides and validate.
pub fn load(path: &Path) -> Result<DeployConfig, ConfigError> {
    load_with(path, |key| std::env::var(key).ok())
}

pub fn load_with<F>(path: &Path, lookup: F) -> Result<DeployConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut map = if path.exists() {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str::<Map<String, Value>>(&content).map_err(|source| {
            ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?
    } else {
        Map::new()
    };

    let from_file = !map.is_empty();
    let overridden = apply_overrides(&mut map, &lookup);
    if !from_file && overridden == 0 {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    tracing::debug!(
        "loaded configuration from {} ({} environment overrides)",
        path.display(),
        overridden
    );

    let mut cfg: DeployConfig =
        serde_json::from_value(Value::Object(map)).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    if cfg.local_root.is_none() {
        cfg.local_root = Some(config_dir(path));
    }
    cfg.validate()?;
    Ok(cfg)
}

fn apply_overrides<F>(map: &mut Map<String, Value>, lookup: &F) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    let mut count = 0;
    for key in ENV_KEYS {
        let Some(raw) = lookup(key) else { continue };
        let value = match key {
            "HOSTS" => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .map(|h| Value::String(h.to_string()))
                    .collect(),
            ),
            "CACHE_CLEAR_MODELS" if raw.trim().is_empty() => Value::Null,
            _ => Value::String(raw),
        };
        map.insert(key.to_string(), value);
        count += 1;
    }
    count
}

fn config_dir(path: &Path) -> PathBuf {
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
    match dir {
        Some(d) => d.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}
