//! Configuration management for `tracker_meta`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`TRACKER_*`)
//! 3. Project config (.tracker/config.yaml)
//! 4. User config (~/.config/tracker/config.yaml)
//! 5. DB config table
//! 6. Defaults

use crate::error::{MetaError, Result};
use crate::pins::{DEFAULT_MAX_PINNED, PinLimits};
use crate::storage::SqliteStorage;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Workspace directory name.
pub const WORKSPACE_DIR: &str = ".tracker";
/// Default database filename inside the workspace directory.
pub const DEFAULT_DB_FILENAME: &str = "tracker.db";
/// Default busy timeout in milliseconds.
pub const DEFAULT_LOCK_TIMEOUT_MS: u64 = 30_000;

/// Runtime key for the pin capacity of one (container, kind).
pub const MAX_PINNED_KEY: &str = "pins.max-per-container";

const ENV_PREFIX: &str = "TRACKER_";

/// Find the workspace directory, walking up from `start` (or the CWD).
///
/// `TRACKER_DIR` short-circuits the search when it points at a directory.
///
/// # Errors
///
/// Returns `NotInitialized` if no workspace is found, or an I/O error if
/// the CWD cannot be read.
pub fn discover_workspace_dir(start: Option<&Path>) -> Result<PathBuf> {
    if let Ok(value) = env::var("TRACKER_DIR") {
        let path = PathBuf::from(value.trim());
        if !value.trim().is_empty() && path.is_dir() {
            return Ok(path);
        }
    }

    let mut current = match start {
        Some(path) => path.to_path_buf(),
        None => env::current_dir()?,
    };

    loop {
        let candidate = current.join(WORKSPACE_DIR);
        if candidate.is_dir() {
            return Ok(candidate);
        }

        if !current.pop() {
            break;
        }
    }

    Err(MetaError::NotInitialized)
}

/// Database path for a workspace, honoring a `db` override.
#[must_use]
pub fn resolve_db_path(workspace_dir: &Path, layer: &ConfigLayer) -> PathBuf {
    db_override_from_layer(layer).unwrap_or_else(|| workspace_dir.join(DEFAULT_DB_FILENAME))
}

/// Open storage for a workspace, returning the storage and the DB path used.
///
/// # Errors
///
/// Returns an error if startup config cannot be read or the database cannot
/// be opened.
pub fn open_storage(
    workspace_dir: &Path,
    cli: &CliOverrides,
) -> Result<(SqliteStorage, PathBuf)> {
    let startup_layer =
        ConfigLayer::merge_layers(&[load_startup_config(workspace_dir)?, cli.as_layer()]);
    let db_path = resolve_db_path(workspace_dir, &startup_layer);
    let lock_timeout =
        lock_timeout_from_layer(&startup_layer).unwrap_or(DEFAULT_LOCK_TIMEOUT_MS);
    let storage = SqliteStorage::open_with_timeout(&db_path, Some(lock_timeout))?;
    Ok((storage, db_path))
}

/// A configuration layer split into startup-only and runtime (DB) keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub startup: HashMap<String, String>,
    pub runtime: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.startup {
            self.startup.insert(key.clone(), value.clone());
        }
        for (key, value) in &other.runtime {
            self.runtime.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        let value: serde_yaml::Value = serde_yaml::from_str(&contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `TRACKER_*` variables.
    ///
    /// `TRACKER_PINS_MAX_PER_CONTAINER` sets `pins.max-per-container`.
    #[must_use]
    pub fn from_vars<I>(vars: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let mut layer = Self::default();
        for (key, value) in vars {
            if key == "TRACKER_DIR" {
                continue;
            }
            if let Some(stripped) = key.strip_prefix(ENV_PREFIX) {
                insert_key_value(&mut layer, stripped, value);
            }
        }
        layer
    }

    /// Build a layer from DB config table values.
    ///
    /// # Errors
    ///
    /// Returns an error if config table lookup fails.
    pub fn from_db(storage: &SqliteStorage) -> Result<Self> {
        let mut layer = Self::default();
        for (key, value) in storage.get_all_config()? {
            if is_startup_key(&key) {
                continue;
            }
            layer.runtime.insert(canonical_key(&key), value);
        }
        Ok(layer)
    }

    /// Runtime value for `key` in any `_`/`-`/`.` spelling.
    #[must_use]
    pub fn runtime_value(&self, key: &str) -> Option<&String> {
        self.runtime.get(&canonical_key(key))
    }

    /// Startup or runtime value for `key`.
    #[must_use]
    pub fn value(&self, key: &str) -> Option<&String> {
        let key = canonical_key(key);
        self.startup.get(&key).or_else(|| self.runtime.get(&key))
    }
}

/// Check a runtime value before it is stored.
///
/// # Errors
///
/// Returns a config error if a known key gets a value it cannot parse.
pub fn validate_runtime_value(key: &str, value: &str) -> Result<()> {
    let mut layer = ConfigLayer::default();
    insert_key_value(&mut layer, key, value.to_string());
    pin_limits_from_layer(&layer)?;
    Ok(())
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub db: Option<PathBuf>,
    pub actor: Option<String>,
    pub lock_timeout: Option<u64>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(path) = &self.db {
            insert_key_value(&mut layer, "db", path.to_string_lossy().to_string());
        }
        if let Some(actor) = &self.actor {
            insert_key_value(&mut layer, "actor", actor.clone());
        }
        if let Some(lock_timeout) = self.lock_timeout {
            insert_key_value(&mut layer, "lock-timeout", lock_timeout.to_string());
        }

        layer
    }
}

/// Load project config (.tracker/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_project_config(workspace_dir: &Path) -> Result<ConfigLayer> {
    ConfigLayer::from_yaml(&workspace_dir.join("config.yaml"))
}

/// Load user config (~/.config/tracker/config.yaml).
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or parsed.
pub fn load_user_config() -> Result<ConfigLayer> {
    let Ok(home) = env::var("HOME") else {
        return Ok(ConfigLayer::default());
    };
    let path = Path::new(&home)
        .join(".config")
        .join("tracker")
        .join("config.yaml");
    ConfigLayer::from_yaml(&path)
}

/// Load startup-only configuration layers (YAML + env, no DB).
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed.
pub fn load_startup_config(workspace_dir: &Path) -> Result<ConfigLayer> {
    let user = load_user_config()?;
    let project = load_project_config(workspace_dir)?;
    let env_layer = ConfigLayer::from_env();

    Ok(ConfigLayer::merge_layers(&[user, project, env_layer]))
}

/// Default config layer (lowest precedence).
#[must_use]
pub fn default_config_layer() -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    layer
        .runtime
        .insert(canonical_key(MAX_PINNED_KEY), DEFAULT_MAX_PINNED.to_string());
    layer
}

/// Load configuration with the full precedence order.
///
/// # Errors
///
/// Returns an error if any config file cannot be read or parsed, or DB access fails.
pub fn load_config(
    workspace_dir: &Path,
    storage: Option<&SqliteStorage>,
    cli: &CliOverrides,
) -> Result<ConfigLayer> {
    let defaults = default_config_layer();
    let db_layer = match storage {
        Some(storage) => ConfigLayer::from_db(storage)?,
        None => ConfigLayer::default(),
    };
    let user = load_user_config()?;
    let project = load_project_config(workspace_dir)?;
    let env_layer = ConfigLayer::from_env();
    let cli_layer = cli.as_layer();

    Ok(ConfigLayer::merge_layers(&[
        defaults, db_layer, user, project, env_layer, cli_layer,
    ]))
}

/// Pin capacity from a merged config layer.
///
/// # Errors
///
/// Returns a config error if the value is not a non-negative integer.
pub fn pin_limits_from_layer(layer: &ConfigLayer) -> Result<PinLimits> {
    let Some(raw) = layer.runtime_value(MAX_PINNED_KEY) else {
        return Ok(PinLimits::default());
    };
    match raw.trim().parse::<i64>() {
        Ok(max_pinned) if max_pinned >= 0 => Ok(PinLimits { max_pinned }),
        _ => Err(MetaError::Config(format!(
            "{MAX_PINNED_KEY} must be a non-negative integer, got '{raw}'"
        ))),
    }
}

/// Resolve the actor name from a merged config layer.
#[must_use]
pub fn actor_from_layer(layer: &ConfigLayer) -> Option<String> {
    get_startup_value(layer, &["actor"])
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

/// Resolve actor with fallback to USER.
#[must_use]
pub fn resolve_actor(layer: &ConfigLayer) -> Option<String> {
    actor_from_layer(layer).or_else(|| {
        env::var("USER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Determine if a key is startup-only.
///
/// Startup-only keys are read from YAML, the environment or the CLI, never
/// from the database.
#[must_use]
pub fn is_startup_key(key: &str) -> bool {
    matches!(
        canonical_key(key).as_str(),
        "db" | "database" | "actor" | "lock-timeout"
    )
}

/// Keys are stored in one spelling so `pins.max-per-container`,
/// `pins_max_per_container` and `PINS_MAX_PER_CONTAINER` collide on merge.
fn insert_key_value(layer: &mut ConfigLayer, key: &str, value: String) {
    let key = canonical_key(key);
    if is_startup_key(&key) {
        layer.startup.insert(key, value);
    } else {
        layer.runtime.insert(key, value);
    }
}

fn canonical_key(key: &str) -> String {
    key.trim().to_lowercase().replace(['_', '.'], "-")
}

fn get_startup_value<'a>(layer: &'a ConfigLayer, keys: &[&str]) -> Option<&'a String> {
    keys.iter()
        .find_map(|key| layer.startup.get(&canonical_key(key)))
}

fn db_override_from_layer(layer: &ConfigLayer) -> Option<PathBuf> {
    get_startup_value(layer, &["db", "database"])
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

fn lock_timeout_from_layer(layer: &ConfigLayer) -> Option<u64> {
    get_startup_value(layer, &["lock-timeout", "lock_timeout"])
        .and_then(|value| value.trim().parse::<u64>().ok())
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        insert_key_value(&mut layer, &key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = key.as_str() else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str.to_string()
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
