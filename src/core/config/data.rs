use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;

use crate::api::models::ModelFilter;
use crate::core::config::io::ConfigError;
use crate::core::exchange::RetryPolicy;
use crate::core::runner::TransportErrorPolicy;
use crate::core::scoring::ScoringConfig;

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Base URL of the OpenAI-compatible API, including the version segment
    pub api_url: String,
    /// Sent as a bearer token when present
    pub api_key: Option<String>,
    /// Per-exchange timeout in seconds
    pub timeout_secs: u64,
    /// Models probed concurrently
    pub max_workers: usize,
    /// Total attempts per exchange, including the first
    pub max_retries: u32,
    /// Base backoff in seconds, doubled after each failed attempt
    pub retry_delay_secs: f64,
    /// Where JSON reports are written
    pub output_dir: PathBuf,
    /// Case-insensitive substrings of model ids that are never probed
    pub exclude_patterns: Vec<String>,
    pub on_transport_error: TransportErrorPolicy,
    pub scoring: ScoringConfig,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_retries,
            Duration::try_from_secs_f64(self.retry_delay_secs).unwrap_or(Duration::ZERO),
        )
    }

    /// Exclusion markers from the config plus an optional id regex.
    pub fn model_filter(&self, pattern: Option<&str>) -> Result<ModelFilter, ConfigError> {
        let pattern = pattern.map(Regex::new).transpose()?;
        Ok(ModelFilter::new(&self.exclude_patterns, pattern))
    }
}

pub fn path_display(path: &Path) -> String {
    path.display().to_string()
}
