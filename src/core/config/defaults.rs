use std::path::PathBuf;

use crate::api::models::DEFAULT_EXCLUDE_MARKERS;
use crate::core::config::data::Config;
use crate::core::runner::TransportErrorPolicy;
use crate::core::scoring::ScoringConfig;

pub const DEFAULT_API_URL: &str = "http://localhost:8317/v1";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_WORKERS: usize = 5;
pub const DEFAULT_MAX_RETRIES: u32 = 2;
pub const DEFAULT_RETRY_DELAY_SECS: f64 = 1.0;
pub const DEFAULT_OUTPUT_DIR: &str = "output";

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            max_workers: DEFAULT_MAX_WORKERS,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delay_secs: DEFAULT_RETRY_DELAY_SECS,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            exclude_patterns: DEFAULT_EXCLUDE_MARKERS
                .iter()
                .map(|marker| marker.to_string())
                .collect(),
            on_transport_error: TransportErrorPolicy::default(),
            scoring: ScoringConfig::default(),
        }
    }
}
