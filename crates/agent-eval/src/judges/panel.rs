//! The judges selected for one case

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use super::{Judge, JudgeContext, JudgeRegistry};
use crate::outcome::JudgeResult;

/// Ordered judges resolved from a case's judge ids
pub struct JudgePanel {
    judges: Vec<Arc<dyn Judge>>,
}

impl JudgePanel {
    /// Resolve ids against the registry; unknown ids are skipped
    pub fn resolve(registry: &JudgeRegistry, ids: &[String]) -> Self {
        let judges = ids
            .iter()
            .filter_map(|id| {
                let judge = registry.get(id);
                if judge.is_none() {
                    tracing::warn!(judge_id = %id, "Unknown judge, skipping");
                }
                judge
            })
            .collect();
        Self { judges }
    }

    /// Panel from explicit judges
    pub fn from_judges(judges: Vec<Arc<dyn Judge>>) -> Self {
        Self { judges }
    }

    pub fn len(&self) -> usize {
        self.judges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.judges.is_empty()
    }

    /// Run every judge in order
    ///
    /// A judge that errors or panics yields a failing result with score 0;
    /// the remaining judges still run.
    pub async fn evaluate(&self, ctx: &JudgeContext<'_>) -> Vec<JudgeResult> {
        let mut results = Vec::with_capacity(self.judges.len());

        for judge in &self.judges {
            let outcome = AssertUnwindSafe(judge.evaluate(ctx)).catch_unwind().await;
            let result = match outcome {
                Ok(Ok(result)) => result,
                Ok(Err(e)) => {
                    tracing::warn!(
                        judge_id = %judge.id(),
                        eval_id = %ctx.eval_case.id,
                        error = %e,
                        "Judge failed"
                    );
                    JudgeResult::fail(judge.id(), format!("Judge error: {}", e))
                }
                Err(_) => {
                    tracing::error!(
                        judge_id = %judge.id(),
                        eval_id = %ctx.eval_case.id,
                        "Judge panicked"
                    );
                    JudgeResult::fail(judge.id(), "Judge error: panicked while scoring")
                }
            };
            results.push(result);
        }

        results
    }
}
