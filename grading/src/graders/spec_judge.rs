use serde_json::json;
use tracing::{info, instrument};

use super::{GradeError, Grader, JudgeHandle, require_content};
use crate::core::criteria::GraderWeights;
use crate::core::response::parse_criteria_response;
use crate::core::types::{GradeContext, GradeInput, GradeResult};
use crate::io::config::SpecConfig;
use crate::io::prompt::{SpecReviewPrompt, render_spec_review};

pub const NAME: &str = "spec_judge";

/// Grades a specification by asking the judge to score each weighted criterion.
#[derive(Debug, Clone)]
pub struct JudgeSpecGrader {
    judge: JudgeHandle,
    weights: GraderWeights,
    passing_threshold: f64,
    prompt_budget_bytes: usize,
}

impl JudgeSpecGrader {
    pub fn new(judge: JudgeHandle, config: &SpecConfig) -> Self {
        Self {
            judge,
            weights: config.weights,
            passing_threshold: config.passing_threshold,
            prompt_budget_bytes: config.prompt_budget_bytes,
        }
    }
}

impl Grader for JudgeSpecGrader {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip_all, fields(task_id = %input.task_id))]
    fn grade(&self, input: &GradeInput) -> Result<GradeResult, GradeError> {
        if !self.judge.is_configured() {
            return Err(GradeError::JudgeNotConfigured);
        }
        let title = match &input.context {
            GradeContext::Spec { title } => title.as_deref(),
            GradeContext::None => None,
            other => {
                return Err(GradeError::InvalidInput(format!(
                    "expected spec context, got {}",
                    other.kind()
                )));
            }
        };
        let spec = require_content(input)?;

        let prompt = render_spec_review(&SpecReviewPrompt {
            title,
            spec,
            weights: &self.weights,
            passing_threshold: self.passing_threshold,
            budget_bytes: self.prompt_budget_bytes,
        })
        .map_err(|err| GradeError::InvalidInput(format!("render prompt: {err:#}")))?;

        let text = self.judge.complete(prompt)?;
        let response = parse_criteria_response(&text)?;
        let mut result = response.into_result(&self.weights, self.passing_threshold);
        result.details.insert("grader".to_string(), json!(NAME));
        result
            .details
            .insert("model".to_string(), json!(self.judge.options().model));
        info!(score = result.score, passed = result.passed, "spec graded");
        Ok(result)
    }
}
