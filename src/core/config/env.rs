use std::path::PathBuf;
use std::str::FromStr;

use crate::core::config::data::Config;
use crate::core::config::io::ConfigError;
use crate::utils::url::check_base_url;

pub const ENV_API_URL: &str = "MODEL_TESTER_API_URL";
pub const ENV_API_KEY: &str = "MODEL_TESTER_API_KEY";
pub const ENV_TIMEOUT: &str = "MODEL_TESTER_TIMEOUT";
pub const ENV_MAX_WORKERS: &str = "MODEL_TESTER_MAX_WORKERS";
pub const ENV_MAX_RETRIES: &str = "MODEL_TESTER_MAX_RETRIES";
pub const ENV_RETRY_DELAY: &str = "MODEL_TESTER_RETRY_DELAY";
pub const ENV_OUTPUT_DIR: &str = "MODEL_TESTER_OUTPUT_DIR";

fn parse_var<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|err: T::Err| ConfigError::Env {
        var,
        value: value.to_string(),
        reason: err.to_string(),
    })
}

impl Config {
    /// Applies `MODEL_TESTER_*` overrides. Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());

        if let Some(url) = get(ENV_API_URL) {
            self.api_url = url.trim().to_string();
        }
        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(value) = get(ENV_TIMEOUT) {
            self.timeout_secs = parse_var(ENV_TIMEOUT, &value)?;
        }
        if let Some(value) = get(ENV_MAX_WORKERS) {
            self.max_workers = parse_var(ENV_MAX_WORKERS, &value)?;
        }
        if let Some(value) = get(ENV_MAX_RETRIES) {
            self.max_retries = parse_var(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = get(ENV_RETRY_DELAY) {
            self.retry_delay_secs = parse_var(ENV_RETRY_DELAY, &value)?;
        }
        if let Some(dir) = get(ENV_OUTPUT_DIR) {
            self.output_dir = PathBuf::from(dir);
        }
        Ok(())
    }

    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|var| std::env::var(var).ok())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        check_base_url(&self.api_url).map_err(ConfigError::Invalid)?;
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.max_workers == 0 {
            return Err(ConfigError::Invalid(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "max_retries must be at least 1".to_string(),
            ));
        }
        if !self.retry_delay_secs.is_finite() || self.retry_delay_secs < 0.0 {
            return Err(ConfigError::Invalid(
                "retry_delay_secs must be a non-negative number".to_string(),
            ));
        }
        self.scoring.validate().map_err(ConfigError::Invalid)
    }
}
