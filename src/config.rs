//! Run configuration: built-in defaults, an optional YAML file, then
//! `DATAMINE_*` environment variables. CLI flags are applied last by the
//! dispatcher.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::data::layout::{DataLayout, DEFAULT_LOCALE, DEFAULT_REGION};

pub const DEFAULT_CONFIG_FILE: &str = "datamine.yaml";

pub const ENV_DATA_ROOT: &str = "DATAMINE_DATA_ROOT";
pub const ENV_REGION: &str = "DATAMINE_REGION";
pub const ENV_LOCALE: &str = "DATAMINE_LOCALE";
pub const ENV_OUTPUT_DIR: &str = "DATAMINE_OUTPUT_DIR";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file '{}' does not exist", path.display())]
    Missing { path: PathBuf },

    #[error("unable to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    #[serde(alias = "root")]
    pub data_root: PathBuf,
    pub region: String,
    pub locale: String,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            data_root: PathBuf::from("."),
            region: DEFAULT_REGION.to_string(),
            locale: DEFAULT_LOCALE.to_string(),
            output_dir: PathBuf::from("output"),
        }
    }
}

impl Config {
    /// Read `explicit` (which must exist) or, failing that, `datamine.yaml` in
    /// the working directory when present. Environment overrides are applied.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) if !path.is_file() => {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                })
            }
            Some(path) => Config::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.is_file() {
                    Config::from_file(default_path)?
                } else {
                    Config::default()
                }
            }
        };
        config.apply_env_from(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Config::from_yaml_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    pub fn from_yaml_str(raw: &str) -> Result<Self, serde_yaml::Error> {
        if raw.trim().is_empty() {
            return Ok(Config::default());
        }
        serde_yaml::from_str(raw)
    }

    /// Override fields from `lookup` (normally the process environment).
    /// Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(root) = get(ENV_DATA_ROOT) {
            self.data_root = PathBuf::from(root);
        }
        if let Some(region) = get(ENV_REGION) {
            self.region = region;
        }
        if let Some(locale) = get(ENV_LOCALE) {
            self.locale = locale;
        }
        if let Some(output_dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(output_dir);
        }
    }

    pub fn layout(&self) -> DataLayout {
        DataLayout::new(&self.data_root, &self.region, &self.locale)
    }
}
