//! Model listing
//!
//! Shows what the endpoint advertises and which models a run would probe,
//! without sending any chat requests.

use std::error::Error;

use chrono::{DateTime, Utc};

use crate::api::models::{fetch_models, ModelFilter};
use crate::api::ModelInfo;
use crate::core::config::Config;

fn created_label(created: u64) -> Option<String> {
    if created == 0 {
        return None;
    }
    // Some endpoints report milliseconds.
    let timestamp_secs = if created > 10_000_000_000 {
        created / 1000
    } else {
        created
    };
    let secs = i64::try_from(timestamp_secs).ok()?;
    DateTime::<Utc>::from_timestamp(secs, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
}

pub fn render_model_list(
    api_url: &str,
    models: &[ModelInfo],
    filter: &ModelFilter,
) -> Vec<String> {
    let mut lines = vec![
        format!("🤖 Models at {api_url}"),
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━".to_string(),
        String::new(),
    ];

    if models.is_empty() {
        lines.push("No models found at this endpoint.".to_string());
        return lines;
    }

    let mut sorted: Vec<&ModelInfo> = models.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));
    let selected = sorted
        .iter()
        .filter(|model| filter.accepts(&model.id))
        .count();

    lines.push(format!(
        "Found {} models, {selected} selected for probing:",
        models.len()
    ));
    lines.push(String::new());

    for model in sorted {
        let marker = if filter.accepts(&model.id) {
            "•"
        } else {
            "◦"
        };
        let note = if filter.is_excluded(&model.id) {
            " (excluded)"
        } else if !filter.accepts(&model.id) {
            " (filtered out)"
        } else {
            ""
        };
        lines.push(format!("  {marker} {}{note}", model.id));
        if let Some(owned_by) = &model.owned_by {
            if !owned_by.is_empty() && owned_by != "system" {
                lines.push(format!("    Owner: {owned_by}"));
            }
        }
        if let Some(created) = model.created.and_then(created_label) {
            lines.push(format!("    Created: {created}"));
        }
    }

    lines
}

pub async fn list_models(config: &Config, filter: &ModelFilter) -> Result<(), Box<dyn Error>> {
    let client = reqwest::Client::new();
    let models_response =
        fetch_models(&client, &config.api_url, config.api_key.as_deref()).await?;

    for line in render_model_list(&config.api_url, &models_response.data, filter) {
        println!("{line}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn model(id: &str, owned_by: Option<&str>, created: Option<u64>) -> ModelInfo {
        ModelInfo {
            id: id.to_string(),
            owned_by: owned_by.map(str::to_string),
            created,
        }
    }

    #[test]
    fn marks_excluded_and_filtered_models() {
        let models = vec![
            model("qwen-coder", Some("local"), Some(1_700_000_000)),
            model("gpt-4o", Some("openai"), None),
            model("llama-3", Some("system"), Some(1_700_000_000_000)),
        ];
        let filter = ModelFilter::new(
            &["gpt".to_string()],
            Some(Regex::new("qwen").expect("valid regex")),
        );

        let lines = render_model_list("http://host/v1", &models, &filter);
        assert!(lines.contains(&"Found 3 models, 1 selected for probing:".to_string()));
        assert!(lines.contains(&"  ◦ gpt-4o (excluded)".to_string()));
        assert!(lines.contains(&"  ◦ llama-3 (filtered out)".to_string()));
        assert!(lines.contains(&"  • qwen-coder".to_string()));
        assert!(lines.contains(&"    Owner: local".to_string()));
        assert!(!lines.contains(&"    Owner: system".to_string()));
        assert_eq!(
            lines
                .iter()
                .filter(|line| line.as_str() == "    Created: 2023-11-14 22:13:20 UTC")
                .count(),
            2
        );
    }

    #[test]
    fn empty_catalog_is_reported() {
        let lines = render_model_list("http://host/v1", &[], &ModelFilter::default());
        assert_eq!(lines.last().map(String::as_str), Some("No models found at this endpoint."));
    }
}
