use regex::Regex;
use tracing::debug;

use crate::api::{ModelInfo, ModelsResponse};
use crate::core::exchange::ExchangeError;
use crate::utils::url::construct_api_url;

/// Model ids containing any of these markers (case-insensitive) are never probed.
pub const DEFAULT_EXCLUDE_MARKERS: &[&str] = &["gpt"];

pub async fn fetch_models(
    client: &reqwest::Client,
    base_url: &str,
    api_key: Option<&str>,
) -> Result<ModelsResponse, ExchangeError> {
    let models_url = construct_api_url(base_url, "models");
    let mut request = client
        .get(models_url)
        .header("Content-Type", "application/json");

    if let Some(api_key) = api_key {
        request = request.header("Authorization", format!("Bearer {api_key}"));
    }

    let response = request.send().await?;

    if !response.status().is_success() {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ExchangeError::Status { status, body });
    }

    let body = response.bytes().await?;
    let models_response = serde_json::from_slice::<ModelsResponse>(&body)?;
    debug!(count = models_response.data.len(), "Fetched model list");
    Ok(models_response)
}

/// Exclusion markers first, then the optional caller pattern.
#[derive(Debug, Clone)]
pub struct ModelFilter {
    exclude_markers: Vec<String>,
    pattern: Option<Regex>,
}

impl ModelFilter {
    pub fn new(exclude_markers: &[String], pattern: Option<Regex>) -> Self {
        Self {
            exclude_markers: exclude_markers
                .iter()
                .map(|marker| marker.to_lowercase())
                .filter(|marker| !marker.is_empty())
                .collect(),
            pattern,
        }
    }

    pub fn is_excluded(&self, model_id: &str) -> bool {
        let lowered = model_id.to_lowercase();
        self.exclude_markers
            .iter()
            .any(|marker| lowered.contains(marker.as_str()))
    }

    pub fn accepts(&self, model_id: &str) -> bool {
        if self.is_excluded(model_id) {
            return false;
        }
        self.pattern
            .as_ref()
            .is_none_or(|pattern| pattern.is_match(model_id))
    }

    pub fn apply(&self, models: Vec<ModelInfo>) -> Vec<ModelInfo> {
        models
            .into_iter()
            .filter(|model| {
                let keep = self.accepts(&model.id);
                if !keep {
                    debug!(model = %model.id, "Filtered out model");
                }
                keep
            })
            .collect()
    }
}

impl Default for ModelFilter {
    fn default() -> Self {
        let markers: Vec<String> = DEFAULT_EXCLUDE_MARKERS
            .iter()
            .map(|marker| marker.to_string())
            .collect();
        Self::new(&markers, None)
    }
}
