use crate::core::config::data::{path_display, Config};

impl Config {
    pub fn print_all(&self) {
        for line in self.describe() {
            println!("{line}");
        }
    }

    /// Effective settings as display lines. The API key is never shown.
    pub fn describe(&self) -> Vec<String> {
        let mut lines = vec!["Current configuration:".to_string()];
        lines.push(format!("  api-url: {}", self.api_url));
        match &self.api_key {
            Some(_) => lines.push("  api-key: (set)".to_string()),
            None => lines.push("  api-key: (unset)".to_string()),
        }
        lines.push(format!("  timeout: {}s", self.timeout_secs));
        lines.push(format!("  max-workers: {}", self.max_workers));
        lines.push(format!("  max-retries: {}", self.max_retries));
        lines.push(format!("  retry-delay: {}s", self.retry_delay_secs));
        lines.push(format!("  output-dir: {}", path_display(&self.output_dir)));
        if self.exclude_patterns.is_empty() {
            lines.push("  exclude-patterns: (none set)".to_string());
        } else {
            lines.push(format!(
                "  exclude-patterns: {}",
                self.exclude_patterns.join(", ")
            ));
        }
        lines.push(format!(
            "  on-transport-error: {}",
            self.on_transport_error.as_str()
        ));
        lines.push(format!("  weights: {}", self.scoring.describe_weights()));
        lines.push(format!(
            "  thresholds: recommended >= {}, partial >= {}",
            self.scoring.thresholds.recommended, self.scoring.thresholds.partial
        ));
        lines
    }
}
