//! Console rendering of a finished run.

use crate::core::outcome::ProbeStatus;
use crate::core::report::RunSummary;
use crate::core::runner::ModelRunResult;
use crate::core::scoring::Recommendation;

const RULE_WIDTH: usize = 80;
const LISTING_LIMIT: usize = 5;
const TOP_PICKS: usize = 3;

fn find<'a>(results: &'a [ModelRunResult], model_id: &str) -> Option<&'a ModelRunResult> {
    results.iter().find(|result| result.model_id == model_id)
}

fn probe_marks(result: &ModelRunResult) -> String {
    result
        .tests
        .iter()
        .map(|(name, outcome)| {
            let mark = if outcome.status == ProbeStatus::Passed {
                '✓'
            } else {
                '✗'
            };
            format!("{name}:{mark}")
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn scored_line(results: &[ModelRunResult], model_id: &str) -> String {
    match find(results, model_id) {
        Some(result) => format!(
            "  - {model_id} ({}) - Score: {:.1}",
            probe_marks(result),
            result.overall_score
        ),
        None => format!("  - {model_id}"),
    }
}

fn push_overflow(lines: &mut Vec<String>, total: usize) {
    if total > LISTING_LIMIT {
        lines.push(format!("  ... and {} more", total - LISTING_LIMIT));
    }
}

pub fn render_summary(summary: &RunSummary, results: &[ModelRunResult]) -> Vec<String> {
    let rule = "=".repeat(RULE_WIDTH);
    let mut lines = vec![
        String::new(),
        rule.clone(),
        format!("MODEL TESTING RESULTS ({} models tested)", summary.tested_models),
        rule.clone(),
    ];

    lines.push(String::new());
    lines.push(format!(
        "✅ Recommended for Autonomous Agent ({} models):",
        summary.recommended.len()
    ));
    for model_id in &summary.recommended {
        lines.push(scored_line(results, model_id));
    }

    lines.push(String::new());
    lines.push(format!(
        "⚠️ Partial Support ({} models):",
        summary.partial_support.len()
    ));
    for model_id in summary.partial_support.iter().take(LISTING_LIMIT) {
        lines.push(scored_line(results, model_id));
    }
    push_overflow(&mut lines, summary.partial_support.len());

    lines.push(String::new());
    lines.push(format!(
        "❌ No Tool Calling ({} models):",
        summary.no_tool_calling.len()
    ));
    for model_id in summary.no_tool_calling.iter().take(LISTING_LIMIT) {
        lines.push(format!("  - {model_id}"));
    }
    push_overflow(&mut lines, summary.no_tool_calling.len());

    let stats = &summary.test_statistics;
    lines.push(String::new());
    lines.push("📈 Test Statistics:".to_string());
    lines.push(format!("  - Total: {}", stats.total));
    lines.push(format!("  - Recommended: {}", stats.recommended));
    lines.push(format!("  - Partial Support: {}", stats.partial_support));
    lines.push(format!("  - No Tool Calling: {}", stats.no_tool_calling));

    let mut top: Vec<&ModelRunResult> = results
        .iter()
        .filter(|result| result.recommendation == Recommendation::Recommended)
        .collect();
    top.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));

    lines.push(String::new());
    lines.push("💡 Recommendations for Autonomous Research Agent:".to_string());
    for (rank, result) in top.iter().take(TOP_PICKS).enumerate() {
        lines.push(format!(
            "  {}. {} (Score: {:.1}, Latency: {}ms)",
            rank + 1,
            result.model_id,
            result.overall_score,
            result.total_latency_ms
        ));
    }

    lines.push(rule);
    lines
}

pub fn print_summary(summary: &RunSummary, results: &[ModelRunResult]) {
    for line in render_summary(summary, results) {
        println!("{line}");
    }
}
