use serde_json::json;
use tracing::{info, instrument};

use super::{GradeError, Grader, JudgeHandle, require_content};
use crate::core::response::parse_verdict_response;
use crate::core::types::{GradeContext, GradeInput, GradeResult};
use crate::io::config::CodeReviewConfig;
use crate::io::prompt::{CodeReviewPrompt, render_code_review};

pub const NAME: &str = "code_review";

/// Asks the judge for a PASS/FAIL verdict on a diff against its task.
///
/// `content` is the diff; the task comes from [`GradeContext::CodeReview`].
#[derive(Debug, Clone)]
pub struct CodeReviewGrader {
    judge: JudgeHandle,
    prompt_budget_bytes: usize,
}

impl CodeReviewGrader {
    pub fn new(judge: JudgeHandle, config: &CodeReviewConfig) -> Self {
        Self {
            judge,
            prompt_budget_bytes: config.prompt_budget_bytes,
        }
    }
}

impl Grader for CodeReviewGrader {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip_all, fields(task_id = %input.task_id, files = input.changed_files.len()))]
    fn grade(&self, input: &GradeInput) -> Result<GradeResult, GradeError> {
        if !self.judge.is_configured() {
            return Err(GradeError::JudgeNotConfigured);
        }
        let GradeContext::CodeReview {
            task_description,
            acceptance_criteria,
        } = &input.context
        else {
            return Err(GradeError::InvalidInput(format!(
                "expected code_review context, got {}",
                input.context.kind()
            )));
        };
        if task_description.trim().is_empty() {
            return Err(GradeError::InvalidInput(
                "task_description must be non-empty".to_string(),
            ));
        }
        let diff = require_content(input)?;

        let prompt = render_code_review(&CodeReviewPrompt {
            task_description,
            acceptance_criteria,
            changed_files: &input.changed_files,
            diff,
            budget_bytes: self.prompt_budget_bytes,
        })
        .map_err(|err| GradeError::InvalidInput(format!("render prompt: {err:#}")))?;

        let text = self.judge.complete(prompt)?;
        let mut result = parse_verdict_response(&text)?.into_result();
        result.details.insert("grader".to_string(), json!(NAME));
        result
            .details
            .insert("model".to_string(), json!(self.judge.options().model));
        info!(score = result.score, passed = result.passed, "code review graded");
        Ok(result)
    }
}
