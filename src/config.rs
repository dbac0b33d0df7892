//! Configuration sources
//!
//! Two kinds of configuration feed a flashing run:
//!
//! - a [ConfigSource], the key/value store the SDK root is read from (the
//!   process environment in the application, a plain map in tests)
//! - an optional `vigilant_flash.toml` file, handled by [Config]

use std::{
    collections::HashMap,
    fs::read_to_string,
    path::{Path, PathBuf},
};

use directories::ProjectDirs;
use log::debug;
use serde::Deserialize;

use crate::error::{ConfigurationError, Error};

/// File name of the configuration file
pub const CONFIG_FILE_NAME: &str = "vigilant_flash.toml";

/// A key/value source of configuration, such as the process environment
pub trait ConfigSource {
    /// Returns the value for `key`, if present
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads values from the environment of the current process
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl ConfigSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl ConfigSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Contents of `vigilant_flash.toml`
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Baud rate used when `--baud` is not given
    #[serde(default)]
    pub baudrate: Option<u32>,
    /// Python interpreter used to run the ESP-IDF tools
    #[serde(default)]
    pub python: Option<PathBuf>,
    /// SDK root used when `IDF_PATH` is not set
    #[serde(default)]
    pub idf_path: Option<PathBuf>,
    /// Reject concurrent flashing sessions on the same serial port
    #[serde(default = "default_lock_port")]
    pub lock_port: bool,
}

fn default_lock_port() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Config {
            baudrate: None,
            python: None,
            idf_path: None,
            lock_port: default_lock_port(),
        }
    }
}

impl Config {
    /// Load the configuration file, falling back to the defaults when none
    /// exists.
    pub fn load() -> Result<Self, Error> {
        match Self::find_config_path()? {
            Some(path) => Self::load_from(&path),
            None => {
                debug!("No {CONFIG_FILE_NAME} found, using defaults");
                Ok(Config::default())
            }
        }
    }

    /// Load the configuration file at `path`.
    pub fn load_from(path: &Path) -> Result<Self, Error> {
        let raw = read_to_string(path).map_err(|source| {
            ConfigurationError::UnreadableConfigFile {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let config = Self::parse(&raw).map_err(|source| ConfigurationError::InvalidConfigFile {
            path: path.to_path_buf(),
            source,
        })?;

        debug!("Config loaded from {}: {:#?}", path.display(), &config);

        Ok(config)
    }

    fn parse(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    fn find_config_path() -> Result<Option<PathBuf>, Error> {
        let current_dir = std::env::current_dir()?;

        let local_config = current_dir.join(CONFIG_FILE_NAME);
        if local_config.is_file() {
            return Ok(Some(local_config));
        }
        if let Some(parent_folder) = current_dir.parent() {
            let workspace_config = parent_folder.join(CONFIG_FILE_NAME);
            if workspace_config.is_file() {
                return Ok(Some(workspace_config));
            }
        }

        let global_config = ProjectDirs::from("io", "vigilant", "vigilant-flash")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
            .filter(|path| path.is_file());

        Ok(global_config)
    }
}
