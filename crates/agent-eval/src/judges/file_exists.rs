//! Presence check for generated files

use async_trait::async_trait;
use serde_json::json;

use super::{Judge, JudgeContext, safe_join_under_root};
use crate::cases::CaseKind;
use crate::error::EvalResult;
use crate::outcome::{JudgeResult, proportional_score};

const PASS_THRESHOLD: f64 = 80.0;

/// Checks that every target file of a code-gen case exists as a regular file
#[derive(Debug, Default)]
pub struct FileExistsJudge;

impl FileExistsJudge {
    pub const ID: &'static str = "file-exists";
}

#[async_trait]
impl Judge for FileExistsJudge {
    fn id(&self) -> &str {
        Self::ID
    }

    fn description(&self) -> &str {
        "Checks that the expected target files were created"
    }

    async fn evaluate(&self, ctx: &JudgeContext<'_>) -> EvalResult<JudgeResult> {
        let target_files = match &ctx.eval_case.kind {
            CaseKind::CodeGen { target_files, .. } if !target_files.is_empty() => target_files,
            _ => return Ok(JudgeResult::not_applicable(Self::ID, "no target files")),
        };

        let mut found = Vec::new();
        let mut missing = Vec::new();

        for file in target_files {
            let exists = match safe_join_under_root(ctx.working_directory, file) {
                Ok(path) => tokio::fs::metadata(&path)
                    .await
                    .map(|meta| meta.is_file())
                    .unwrap_or(false),
                Err(msg) => {
                    tracing::debug!(file = %file, "{}", msg);
                    false
                }
            };
            if exists {
                found.push(file.clone());
            } else {
                missing.push(file.clone());
            }
        }

        let score = proportional_score(found.len(), target_files.len());
        let reasoning = if missing.is_empty() {
            format!("All {} target files exist", target_files.len())
        } else {
            format!(
                "Found {}/{} target files; missing: {}",
                found.len(),
                target_files.len(),
                missing.join(", ")
            )
        };

        Ok(
            JudgeResult::new(Self::ID, score >= PASS_THRESHOLD, score, reasoning)
                .with_details(json!({ "found": found, "missing": missing })),
        )
    }
}
