//! Case-level and suite-level results
//!
//! Aggregates individual case results into suite statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ExecutionResult, JudgeResult, Usage};
use crate::cases::{Category, EvalCase};

/// Final outcome class of a case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    /// Execution succeeded and every judge passed
    Passed,
    /// Ran to completion but execution or a judge failed
    Failed,
    /// Carries a terminal error
    Errored,
}

/// Final verdict for one eval case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalCaseResult {
    /// The originating case
    pub eval_case: EvalCase,

    /// Execution succeeded and all judges passed
    pub success: bool,

    /// Output of the final attempt
    pub output: String,

    /// Duration of the whole case including retries, in milliseconds
    pub duration_ms: u64,

    /// Judge verdicts of the final attempt, in declared order
    #[serde(default)]
    pub judge_results: Vec<JudgeResult>,

    /// Terminal error of the final attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Number of attempts beyond the first
    pub retry_count: u32,

    /// Execution outcome of the final attempt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution: Option<ExecutionResult>,
}

impl EvalCaseResult {
    /// A case that ended with a terminal error before producing an outcome
    pub fn errored(eval_case: EvalCase, error: impl Into<String>, retry_count: u32) -> Self {
        Self {
            eval_case,
            success: false,
            output: String::new(),
            duration_ms: 0,
            judge_results: Vec::new(),
            error: Some(error.into()),
            retry_count,
            execution: None,
        }
    }

    /// Outcome class
    pub fn status(&self) -> CaseStatus {
        if self.error.is_some() {
            CaseStatus::Errored
        } else if self.success {
            CaseStatus::Passed
        } else {
            CaseStatus::Failed
        }
    }

    /// Judges that did not pass
    pub fn failed_judges(&self) -> impl Iterator<Item = &JudgeResult> {
        self.judge_results.iter().filter(|r| !r.passed)
    }
}

/// Pass statistics for one category
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryBreakdown {
    pub total: usize,
    pub passed: usize,
    pub pass_rate: f64,
}

/// A failing judge as seen by failure mining
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedJudge {
    pub judge_id: String,
    pub score: f64,
    pub reasoning: String,
}

/// Data handed to failure mining for one unsuccessful case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailureSummary {
    pub case_id: String,
    pub category: Category,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub failed_judges: Vec<FailedJudge>,
    pub output: String,
}

/// Aggregate result of one suite run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvalSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    /// passed / total
    pub pass_rate: f64,
    pub results: Vec<EvalCaseResult>,
    pub duration_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub run_id: String,
}

impl EvalSuiteResult {
    /// Aggregate case results into suite statistics
    pub fn aggregate(results: Vec<EvalCaseResult>, duration_ms: u64) -> Self {
        let total = results.len();
        let mut passed = 0;
        let mut failed = 0;
        let mut errors = 0;

        for result in &results {
            match result.status() {
                CaseStatus::Passed => passed += 1,
                CaseStatus::Failed => failed += 1,
                CaseStatus::Errored => errors += 1,
            }
        }

        let pass_rate = if total > 0 {
            passed as f64 / total as f64
        } else {
            0.0
        };

        Self {
            total,
            passed,
            failed,
            errors,
            pass_rate,
            results,
            duration_ms,
            timestamp: Utc::now(),
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Whether every case passed
    pub fn all_passed(&self) -> bool {
        self.passed == self.total
    }

    /// Pass statistics per category
    pub fn by_category(&self) -> BTreeMap<Category, CategoryBreakdown> {
        let mut grouped: BTreeMap<Category, (usize, usize)> = BTreeMap::new();

        for result in &self.results {
            let entry = grouped.entry(result.eval_case.category()).or_default();
            entry.0 += 1;
            if result.success {
                entry.1 += 1;
            }
        }

        grouped
            .into_iter()
            .map(|(category, (total, passed))| {
                let pass_rate = if total > 0 {
                    passed as f64 / total as f64
                } else {
                    0.0
                };
                (
                    category,
                    CategoryBreakdown {
                        total,
                        passed,
                        pass_rate,
                    },
                )
            })
            .collect()
    }

    /// Summed usage over final attempts that reported it
    pub fn total_usage(&self) -> Option<Usage> {
        self.results
            .iter()
            .filter_map(|r| r.execution.as_ref().and_then(|e| e.usage))
            .reduce(Usage::merge)
    }

    /// Unsuccessful cases in the shape consumed by failure mining
    pub fn failures(&self) -> Vec<FailureSummary> {
        self.results
            .iter()
            .filter(|r| !r.success)
            .map(|r| FailureSummary {
                case_id: r.eval_case.id.clone(),
                category: r.eval_case.category(),
                error: r.error.clone(),
                failed_judges: r
                    .failed_judges()
                    .map(|j| FailedJudge {
                        judge_id: j.judge_id.clone(),
                        score: j.score,
                        reasoning: j.reasoning.clone(),
                    })
                    .collect(),
                output: r.output.clone(),
            })
            .collect()
    }
}
