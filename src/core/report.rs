//! Run aggregation and the timestamped JSON report artifact.

use std::fs;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;

use crate::core::config::data::path_display;
use crate::core::runner::{ModelRunResult, RunError};
use crate::core::scoring::Recommendation;

pub const REPORT_FILE_PREFIX: &str = "model_capabilities_";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestStatistics {
    pub total: usize,
    pub recommended: usize,
    pub partial_support: usize,
    pub no_tool_calling: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// UTC, RFC 3339 with a `Z` suffix.
    pub timestamp: String,
    pub api_endpoint: String,
    /// Models selected for probing after filtering.
    pub total_models: usize,
    /// Models that completed the suite and were classified.
    pub tested_models: usize,
    pub recommended: Vec<String>,
    pub partial_support: Vec<String>,
    pub no_tool_calling: Vec<String>,
    pub test_statistics: TestStatistics,
}

impl RunSummary {
    pub fn from_results(
        api_endpoint: &str,
        total_models: usize,
        results: &[ModelRunResult],
        generated_at: DateTime<Utc>,
    ) -> Self {
        let ids_for = |tier: Recommendation| -> Vec<String> {
            results
                .iter()
                .filter(|result| result.recommendation == tier)
                .map(|result| result.model_id.clone())
                .collect()
        };

        let recommended = ids_for(Recommendation::Recommended);
        let partial_support = ids_for(Recommendation::PartialSupport);
        let no_tool_calling = ids_for(Recommendation::NoToolCalling);

        let test_statistics = TestStatistics {
            total: results.len(),
            recommended: recommended.len(),
            partial_support: partial_support.len(),
            no_tool_calling: no_tool_calling.len(),
        };

        Self {
            timestamp: generated_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            api_endpoint: api_endpoint.to_string(),
            total_models,
            tested_models: results.len(),
            recommended,
            partial_support,
            no_tool_calling,
            test_statistics,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub api_url: String,
    pub quick_mode: bool,
    pub test_weights: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_pattern: Option<String>,
    pub max_workers: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullReport {
    pub summary: RunSummary,
    pub results: Vec<ModelRunResult>,
    pub metadata: ReportMetadata,
}

pub fn report_file_name(now: DateTime<Local>) -> String {
    format!("{REPORT_FILE_PREFIX}{}.json", now.format("%Y%m%d_%H%M%S"))
}

impl FullReport {
    /// Writes the report into `output_dir` (created if missing) through a
    /// temp file in the same directory, returning the final path.
    pub fn write_to_dir(&self, output_dir: &Path, now: DateTime<Local>) -> Result<PathBuf, RunError> {
        let path = output_dir.join(report_file_name(now));
        let report_error = |source: std::io::Error| RunError::Report {
            path: path_display(&path),
            source,
        };

        fs::create_dir_all(output_dir).map_err(report_error)?;
        let temp_file = NamedTempFile::new_in(output_dir).map_err(report_error)?;

        {
            let mut writer = BufWriter::new(temp_file.as_file());
            serde_json::to_writer_pretty(&mut writer, self)
                .map_err(|err| report_error(err.into()))?;
            writer.write_all(b"\n").map_err(report_error)?;
            writer.flush().map_err(report_error)?;
        }

        temp_file
            .persist(&path)
            .map_err(|err| report_error(err.error))?;
        Ok(path)
    }
}
