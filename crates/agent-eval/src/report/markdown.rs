//! Markdown report generation

use super::status_label;
use crate::outcome::EvalSuiteResult;

/// Markdown report generator
pub struct MarkdownReporter;

impl MarkdownReporter {
    /// Generate a Markdown report
    pub fn generate(suite: &EvalSuiteResult) -> String {
        let mut md = String::new();

        md.push_str("# Eval Report\n\n");

        // Overview
        md.push_str("## Overview\n\n");
        md.push_str(&format!("- **Run**: {}\n", suite.run_id));
        md.push_str(&format!(
            "- **Timestamp**: {}\n",
            suite.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        md.push_str(&format!(
            "- **Total Execution Time**: {:.1}s\n\n",
            suite.duration_ms as f64 / 1000.0
        ));

        // Summary
        md.push_str("## Summary\n\n");
        md.push_str("| Metric | Value |\n|--------|-------|\n");
        md.push_str(&format!(
            "| Pass Rate | {}/{} ({:.1}%) |\n",
            suite.passed,
            suite.total,
            suite.pass_rate * 100.0
        ));
        md.push_str(&format!("| Failed | {} |\n", suite.failed));
        md.push_str(&format!("| Errors | {} |\n", suite.errors));
        if let Some(usage) = suite.total_usage() {
            md.push_str(&format!("| Total Tokens | {} |\n", usage.total_tokens()));
        }
        md.push('\n');

        // By Category
        md.push_str("## Results by Category\n\n");
        md.push_str("| Category | Cases | Passed | Rate |\n");
        md.push_str("|----------|-------|--------|------|\n");

        for (category, breakdown) in suite.by_category() {
            md.push_str(&format!(
                "| {} | {} | {} | {:.1}% |\n",
                category.display_name(),
                breakdown.total,
                breakdown.passed,
                breakdown.pass_rate * 100.0
            ));
        }
        md.push('\n');

        // Case Results
        md.push_str("## Case Results\n\n");
        md.push_str("| Case | Category | Status | Retries | Time |\n");
        md.push_str("|------|----------|--------|---------|------|\n");

        for result in &suite.results {
            md.push_str(&format!(
                "| {} | {} | {} | {} | {:.1}s |\n",
                result.eval_case.id,
                result.eval_case.category(),
                status_label(result.status()),
                result.retry_count,
                result.duration_ms as f64 / 1000.0
            ));
        }
        md.push('\n');

        // Failure details
        let failures = suite.failures();
        if !failures.is_empty() {
            md.push_str("## Failed Cases\n\n");

            for failure in failures {
                md.push_str(&format!("### {}\n\n", failure.case_id));
                md.push_str(&format!("- **Category**: {}\n", failure.category));

                if let Some(ref error) = failure.error {
                    md.push_str(&format!("- **Error**: {}\n", error));
                }

                for judge in &failure.failed_judges {
                    md.push_str(&format!(
                        "- **{}** ({:.0}): {}\n",
                        judge.judge_id, judge.score, judge.reasoning
                    ));
                }

                if !failure.output.is_empty() {
                    md.push_str(&format!("\n```\n{}\n```\n", failure.output));
                }
                md.push('\n');
            }
        }

        md
    }
}
