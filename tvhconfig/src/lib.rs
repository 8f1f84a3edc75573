//! # Tvheadend client configuration
//!
//! Settings are read from three layers, each one overriding the previous:
//!
//! 1. the defaults compiled into this crate (`tvheadend.yaml`),
//! 2. `config.yaml` in the configuration directory, when present,
//! 3. `TVHEADEND_CONFIG__<SECTION>__<KEY>=<yaml value>` environment variables.
//!
//! Consumers read whole sections into typed structs:
//!
//! ```no_run
//! use tvhconfig::{get_config, LoggerSection};
//!
//! let config = get_config();
//! let logger: LoggerSection = config.section("logger")?;
//! let input_id = config.input_id()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use anyhow::{Context, Result};
use lazy_static::lazy_static;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use tracing::{debug, info, warn};

pub mod logging;

pub use logging::{init_logging, LogHandle};

const DEFAULTS: &str = include_str!("tvheadend.yaml");
const CONFIG_FILE: &str = "config.yaml";
const DIR_ENV: &str = "TVHEADEND_CONFIG";
const OVERRIDE_PREFIX: &str = "TVHEADEND_CONFIG__";
const DIR_NAME: &str = ".tvheadend";

lazy_static! {
    static ref CONFIG: Arc<Config> = Arc::new(Config::load_or_defaults());
}

/// `logger` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerSection {
    pub min_level: String,
    pub enable_console: bool,
}

impl Default for LoggerSection {
    fn default() -> Self {
        Self {
            min_level: "INFO".to_string(),
            enable_console: true,
        }
    }
}

/// `registry` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySection {
    /// Input service whose channels the registry manages.
    pub input_id: String,
}

impl Default for RegistrySection {
    fn default() -> Self {
        Self {
            input_id: "ie.macinnes.tvheadend/.tv.TvheadendTvInputService".to_string(),
        }
    }
}

/// Read-only view of the layered configuration.
#[derive(Clone, Debug)]
pub struct Config {
    directory: Option<PathBuf>,
    tree: Value,
}

impl Config {
    /// Built-in defaults only.
    pub fn defaults() -> Result<Self> {
        Ok(Self {
            directory: None,
            tree: parse_lowercased(DEFAULTS).context("embedded defaults")?,
        })
    }

    /// Loads defaults, then `directory/config.yaml`, then the environment.
    ///
    /// A missing directory or file is not an error.
    pub fn load(directory: impl AsRef<Path>) -> Result<Self> {
        let directory = directory.as_ref();
        let mut config = Self::defaults()?;

        let file = directory.join(CONFIG_FILE);
        match fs::read_to_string(&file) {
            Ok(text) => {
                let layer = parse_lowercased(&text)
                    .with_context(|| format!("parsing {}", file.display()))?;
                overlay(&mut config.tree, layer);
                info!(file = %file.display(), "Configuration loaded");
            }
            Err(err) => debug!(file = %file.display(), "No configuration file: {}", err),
        }

        for (name, raw) in env::vars() {
            let Some(rest) = name.strip_prefix(OVERRIDE_PREFIX) else {
                continue;
            };
            let keys: Vec<String> = rest.split("__").map(str::to_lowercase).collect();
            let value = serde_yaml::from_str(&raw).unwrap_or(Value::String(raw));
            debug!(variable = %name, "Configuration override from environment");
            insert_at(&mut config.tree, &keys, value);
        }

        config.directory = Some(directory.to_path_buf());
        Ok(config)
    }

    /// Directory named by `TVHEADEND_CONFIG`, else `~/.tvheadend`, else
    /// `./.tvheadend`.
    pub fn locate_directory() -> PathBuf {
        if let Some(dir) = env::var_os(DIR_ENV) {
            return PathBuf::from(dir);
        }
        dirs::home_dir()
            .map(|home| home.join(DIR_NAME))
            .filter(|dir| dir.is_dir())
            .unwrap_or_else(|| PathBuf::from(DIR_NAME))
    }

    fn load_or_defaults() -> Self {
        let directory = Self::locate_directory();
        Self::load(&directory)
            .or_else(|err| {
                warn!(directory = %directory.display(), "Falling back to built-in configuration: {:#}", err);
                Self::defaults()
            })
            .unwrap_or(Self {
                directory: None,
                tree: Value::Mapping(Mapping::new()),
            })
    }

    /// Directory the configuration was loaded from, `None` for pure defaults.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    /// Raw value at a dotted-style key path (`&["player", "stream_profile"]`).
    pub fn value(&self, path: &[&str]) -> Option<&Value> {
        path.iter().try_fold(&self.tree, |node, key| {
            node.as_mapping()?.get(key.to_lowercase().as_str())
        })
    }

    /// Deserializes a top-level section. An absent section yields `T::default()`.
    pub fn section<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        match self.value(&[name]) {
            None | Some(Value::Null) => Ok(T::default()),
            Some(value) => serde_yaml::from_value(value.clone())
                .with_context(|| format!("invalid `{name}` configuration section")),
        }
    }

    pub fn logger(&self) -> Result<LoggerSection> {
        self.section("logger")
    }

    pub fn input_id(&self) -> Result<String> {
        Ok(self.section::<RegistrySection>("registry")?.input_id)
    }
}

/// Returns the process-wide configuration, loaded on first use.
pub fn get_config() -> Arc<Config> {
    CONFIG.clone()
}

/// Parses YAML and lowercases every mapping key. Empty text is an empty map.
fn parse_lowercased(text: &str) -> Result<Value> {
    let value: Value = serde_yaml::from_str(text)?;
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => lowercase_keys(other),
    })
}

fn lowercase_keys(value: Value) -> Value {
    match value {
        Value::Mapping(map) => Value::Mapping(
            map.into_iter()
                .map(|(key, child)| {
                    let key = match key {
                        Value::String(name) => Value::String(name.to_lowercase()),
                        other => other,
                    };
                    (key, lowercase_keys(child))
                })
                .collect(),
        ),
        other => other,
    }
}

/// Applies `layer` on top of `base`: maps merge recursively, anything else
/// replaces.
fn overlay(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Mapping(base), Value::Mapping(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => overlay(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (_, Value::Null) => {}
        (base, layer) => *base = layer,
    }
}

fn insert_at(node: &mut Value, keys: &[String], value: Value) {
    let Some((first, rest)) = keys.split_first() else {
        *node = value;
        return;
    };
    if !node.is_mapping() {
        *node = Value::Mapping(Mapping::new());
    }
    if let Value::Mapping(map) = node {
        let child = map
            .entry(Value::String(first.clone()))
            .or_insert(Value::Null);
        insert_at(child, rest, value);
    }
}
