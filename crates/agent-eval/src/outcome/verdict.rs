//! Judge verdicts

use serde::{Deserialize, Serialize};

/// Verdict produced by one judge for one execution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JudgeResult {
    pub judge_id: String,
    pub passed: bool,
    /// 0-100
    pub score: f64,
    /// 0-1
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

fn default_confidence() -> f64 {
    1.0
}

impl JudgeResult {
    /// Create a verdict; score and confidence are clamped to their ranges
    pub fn new(
        judge_id: impl Into<String>,
        passed: bool,
        score: f64,
        reasoning: impl Into<String>,
    ) -> Self {
        Self {
            judge_id: judge_id.into(),
            passed,
            score: clamp(score, 0.0, 100.0),
            confidence: 1.0,
            reasoning: reasoning.into(),
            details: None,
        }
    }

    /// A passing verdict with full score
    pub fn pass(judge_id: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(judge_id, true, 100.0, reasoning)
    }

    /// A failing verdict with zero score
    pub fn fail(judge_id: impl Into<String>, reasoning: impl Into<String>) -> Self {
        Self::new(judge_id, false, 0.0, reasoning)
    }

    /// The judge does not apply to this case; always passes
    pub fn not_applicable(judge_id: impl Into<String>, why: impl AsRef<str>) -> Self {
        Self::pass(judge_id, format!("Not applicable: {}", why.as_ref()))
            .with_details(serde_json::json!({ "applicable": false }))
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = clamp(confidence, 0.0, 1.0);
        self
    }

    /// Attach structured details
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Whether this verdict is a not-applicable pass
    pub fn is_not_applicable(&self) -> bool {
        self.details
            .as_ref()
            .and_then(|d| d.get("applicable"))
            .and_then(|v| v.as_bool())
            == Some(false)
    }
}

fn clamp(value: f64, min: f64, max: f64) -> f64 {
    if value.is_nan() { min } else { value.clamp(min, max) }
}

/// Proportional score `matched/total*100`, rounded to two decimals
pub fn proportional_score(matched: usize, total: usize) -> f64 {
    if total == 0 {
        return 100.0;
    }
    let raw = matched as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
