use std::sync::Arc;

use serde_json::json;
use tracing::{info, instrument};

use super::{GradeError, Grader};
use crate::core::applicability::{Applicability, ApplicabilityRule};
use crate::core::coverage::{CoverageReport, evaluate_coverage};
use crate::core::types::{GradeContext, GradeInput, GradeResult};
use crate::io::config::CoverageConfig;
use crate::io::coverage_tool::CoverageTool;

pub const NAME: &str = "coverage";

/// Passes when measured coverage of the changed files reaches the threshold.
#[derive(Clone)]
pub struct CoverageGrader {
    tool: Arc<dyn CoverageTool>,
    threshold: f64,
    rule: ApplicabilityRule,
}

impl std::fmt::Debug for CoverageGrader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoverageGrader")
            .field("threshold", &self.threshold)
            .field("rule", &self.rule)
            .finish_non_exhaustive()
    }
}

impl CoverageGrader {
    pub fn new(tool: Arc<dyn CoverageTool>, config: &CoverageConfig) -> Self {
        Self {
            tool,
            threshold: config.threshold,
            rule: config.applicability.clone(),
        }
    }

    fn threshold_for(&self, input: &GradeInput) -> Result<f64, GradeError> {
        match &input.context {
            GradeContext::Coverage {
                threshold_override: Some(threshold),
            } => {
                if !(0.0..=100.0).contains(threshold) {
                    return Err(GradeError::InvalidInput(format!(
                        "threshold_override must be within [0, 100], got {threshold}"
                    )));
                }
                Ok(*threshold)
            }
            GradeContext::Coverage {
                threshold_override: None,
            }
            | GradeContext::None => Ok(self.threshold),
            other => Err(GradeError::InvalidInput(format!(
                "expected coverage context, got {}",
                other.kind()
            ))),
        }
    }
}

impl Grader for CoverageGrader {
    fn name(&self) -> &'static str {
        NAME
    }

    fn applicability(&self, input: &GradeInput) -> Applicability {
        self.rule.check(input)
    }

    #[instrument(skip_all, fields(task_id = %input.task_id, files = input.changed_files.len()))]
    fn grade(&self, input: &GradeInput) -> Result<GradeResult, GradeError> {
        let threshold = self.threshold_for(input)?;
        let report = self
            .tool
            .measure(&input.workdir, &input.changed_files)
            .map_err(GradeError::Coverage)?;

        let mut details = std::collections::BTreeMap::new();
        details.insert("grader".to_string(), json!(NAME));
        details.insert("threshold".to_string(), json!(threshold));

        let result = match report {
            CoverageReport::NoTestFiles => {
                details.insert("coverage".to_string(), json!(null));
                GradeResult {
                    passed: false,
                    score: 0.0,
                    message: "no test files".to_string(),
                    details,
                }
            }
            CoverageReport::Percent(actual) => {
                let passed = evaluate_coverage(actual, threshold);
                details.insert("coverage".to_string(), json!(actual));
                GradeResult {
                    passed,
                    score: actual.clamp(0.0, 100.0),
                    message: format!("coverage {actual:.1}% (threshold {threshold:.1}%)"),
                    details,
                }
            }
        };
        info!(score = result.score, passed = result.passed, "coverage graded");
        Ok(result)
    }
}
