use crate::core::config::data::{path_display, Config};
use directories::ProjectDirs;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

/// Errors that can occur while assembling the effective configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("Failed to read config at {}: {source}", path_display(.path))]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Failed to parse the configuration file as valid TOML.
    #[error("Failed to parse config at {}: {source}", path_display(.path))]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Failed to write the configuration file.
    #[error("Failed to write config at {}: {source}", path_display(.path))]
    Write {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// An environment override could not be parsed.
    #[error("Invalid value {value:?} for {var}: {reason}")]
    Env {
        var: &'static str,
        value: String,
        reason: String,
    },

    /// The filter pattern is not a valid regular expression.
    #[error("Invalid filter pattern: {0}")]
    InvalidFilter(#[from] regex::Error),

    /// The assembled configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads `config_path`, or defaults when the file does not exist.
    pub fn load_from_path(config_path: &Path) -> Result<Config, ConfigError> {
        if !config_path.exists() {
            debug!(path = %path_display(config_path), "No config file, using defaults");
            return Ok(Config::default());
        }

        let contents = fs::read_to_string(config_path).map_err(|source| ConfigError::Read {
            path: config_path.to_path_buf(),
            source,
        })?;
        toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: config_path.to_path_buf(),
            source,
        })
    }

    /// Writes the config atomically through a sibling temp file.
    pub fn save_to_path(&self, config_path: &Path) -> Result<(), ConfigError> {
        let write_error = |source: Box<dyn std::error::Error + Send + Sync>| ConfigError::Write {
            path: config_path.to_path_buf(),
            source,
        };

        let parent = config_path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty());

        if let Some(dir) = parent {
            fs::create_dir_all(dir).map_err(|err| write_error(Box::new(err)))?;
        }

        let contents = toml::to_string_pretty(self).map_err(|err| write_error(Box::new(err)))?;
        let mut temp_file = match parent {
            Some(dir) => NamedTempFile::new_in(dir),
            None => NamedTempFile::new_in("."),
        }
        .map_err(|err| write_error(Box::new(err)))?;

        temp_file
            .write_all(contents.as_bytes())
            .and_then(|_| temp_file.as_file_mut().sync_all())
            .map_err(|err| write_error(Box::new(err)))?;
        temp_file
            .persist(config_path)
            .map_err(|err| write_error(Box::new(err)))?;
        Ok(())
    }

    /// Platform config location, e.g. `~/.config/toolprobe/config.toml`.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("org", "toolprobe", "toolprobe")
            .map(|proj_dirs| proj_dirs.config_dir().join("config.toml"))
    }

    /// File (explicit path, else the platform default), then environment.
    /// An explicit path must exist. Callers validate once their own
    /// overrides are applied.
    pub fn load(explicit_path: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match explicit_path {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::Read {
                        path: path.to_path_buf(),
                        source: std::io::Error::new(
                            std::io::ErrorKind::NotFound,
                            "file does not exist",
                        ),
                    });
                }
                Config::load_from_path(path)?
            }
            None => match Config::default_config_path() {
                Some(path) => Config::load_from_path(&path)?,
                None => Config::default(),
            },
        };

        config.apply_process_env()?;
        Ok(config)
    }
}
