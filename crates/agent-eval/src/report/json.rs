//! JSON report generation

use crate::error::EvalResult;
use crate::outcome::EvalSuiteResult;

/// JSON report generator
pub struct JsonReporter;

impl JsonReporter {
    /// Generate a JSON report
    pub fn generate(suite: &EvalSuiteResult) -> EvalResult<String> {
        Ok(serde_json::to_string_pretty(suite)?)
    }

    /// Generate a compact JSON report (no pretty printing)
    pub fn generate_compact(suite: &EvalSuiteResult) -> EvalResult<String> {
        Ok(serde_json::to_string(suite)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::test_support::sample_suite;

    #[test]
    fn test_json_generation() {
        let json = JsonReporter::generate(&sample_suite()).unwrap();

        assert!(json.contains("passRate"));
        assert!(json.contains("judgeResults"));
        assert!(!JsonReporter::generate_compact(&sample_suite()).unwrap().contains('\n'));
    }
}
