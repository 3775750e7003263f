//! Report generation for suite results
//!
//! Generates reports in table, JSON and Markdown formats and persists raw
//! results.

mod json;
mod markdown;

pub use json::JsonReporter;
pub use markdown::MarkdownReporter;

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::EvalResult;
use crate::outcome::{CaseStatus, EvalSuiteResult};

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
    Markdown,
}

impl std::str::FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "table" => Ok(ReportFormat::Table),
            "json" => Ok(ReportFormat::Json),
            "markdown" | "md" => Ok(ReportFormat::Markdown),
            other => Err(format!("Unknown report format: {}", other)),
        }
    }
}

/// Generate a report in the specified format
pub fn generate_report(suite: &EvalSuiteResult, format: ReportFormat) -> EvalResult<String> {
    match format {
        ReportFormat::Table => Ok(generate_table(suite)),
        ReportFormat::Json => JsonReporter::generate(suite),
        ReportFormat::Markdown => Ok(MarkdownReporter::generate(suite)),
    }
}

/// Write the suite as `eval_results_<timestamp>.json` under `output_dir`
pub async fn save_results(suite: &EvalSuiteResult, output_dir: &Path) -> EvalResult<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let output_path = output_dir.join(format!("eval_results_{}.json", timestamp));

    let json = JsonReporter::generate(suite)?;
    tokio::fs::write(&output_path, json).await?;

    Ok(output_path)
}

pub(crate) fn status_label(status: CaseStatus) -> &'static str {
    match status {
        CaseStatus::Passed => "PASS",
        CaseStatus::Failed => "FAIL",
        CaseStatus::Errored => "ERROR",
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let head: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

/// Generate a simple table report for terminal output
fn generate_table(suite: &EvalSuiteResult) -> String {
    let mut output = String::new();

    output.push_str(&format!("\n{:=<70}\n", "= Eval Results "));
    output.push_str(&format!("Run: {}\n", suite.run_id));
    output.push_str(&format!(
        "Timestamp: {}\n",
        suite.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    output.push_str(&format!("{:=<70}\n\n", ""));

    // Summary
    output.push_str("SUMMARY\n");
    output.push_str(&format!("{:-<70}\n", ""));
    output.push_str(&format!(
        "Passed: {}/{} ({:.1}%)\n",
        suite.passed,
        suite.total,
        suite.pass_rate * 100.0
    ));
    output.push_str(&format!("Failed: {}\n", suite.failed));
    output.push_str(&format!("Errors: {}\n", suite.errors));
    output.push_str(&format!(
        "Total Time: {:.1}s\n",
        suite.duration_ms as f64 / 1000.0
    ));
    if let Some(usage) = suite.total_usage() {
        output.push_str(&format!("Total Tokens: {}\n", usage.total_tokens()));
        if let Some(cost) = usage.cost_usd {
            output.push_str(&format!("Cost: ${:.4}\n", cost));
        }
    }
    output.push('\n');

    // By Category
    output.push_str("BY CATEGORY\n");
    output.push_str(&format!("{:-<70}\n", ""));
    output.push_str(&format!(
        "{:<20} {:>8} {:>10} {:>10}\n",
        "Category", "Cases", "Passed", "Rate"
    ));
    output.push_str(&format!("{:-<70}\n", ""));

    for (category, breakdown) in suite.by_category() {
        output.push_str(&format!(
            "{:<20} {:>8} {:>10} {:>9.1}%\n",
            category.display_name(),
            breakdown.total,
            breakdown.passed,
            breakdown.pass_rate * 100.0
        ));
    }

    output.push_str(&format!("{:-<70}\n\n", ""));

    // Case Results
    output.push_str("CASE RESULTS\n");
    output.push_str(&format!("{:-<70}\n", ""));
    output.push_str(&format!(
        "{:<34} {:>8} {:>8} {:>8} {:>8}\n",
        "Case", "Status", "Score", "Retries", "Time"
    ));
    output.push_str(&format!("{:-<70}\n", ""));

    for result in &suite.results {
        let score = if result.judge_results.is_empty() {
            "-".to_string()
        } else {
            let avg = result.judge_results.iter().map(|j| j.score).sum::<f64>()
                / result.judge_results.len() as f64;
            format!("{:.0}", avg)
        };

        output.push_str(&format!(
            "{:<34} {:>8} {:>8} {:>8} {:>7.1}s\n",
            truncate(&result.eval_case.id, 32),
            status_label(result.status()),
            score,
            result.retry_count,
            result.duration_ms as f64 / 1000.0
        ));
    }

    output.push_str(&format!("{:=<70}\n", ""));

    output
}
