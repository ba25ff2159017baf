use serde_json::json;
use tracing::{debug, instrument};

use super::{GradeError, Grader};
use crate::core::criteria::GraderWeights;
use crate::core::heuristic::score_criteria;
use crate::core::response::criteria_details;
use crate::core::types::{GradeInput, GradeResult};
use crate::io::config::SpecConfig;

pub const NAME: &str = "spec_heuristic";

/// Scores a specification from textual signals alone. Never errors.
#[derive(Debug, Clone)]
pub struct HeuristicSpecGrader {
    weights: GraderWeights,
    passing_threshold: f64,
}

impl HeuristicSpecGrader {
    pub fn new(weights: GraderWeights, passing_threshold: f64) -> Self {
        Self {
            weights,
            passing_threshold,
        }
    }

    pub fn from_config(config: &SpecConfig) -> Self {
        Self::new(config.weights, config.passing_threshold)
    }
}

impl Default for HeuristicSpecGrader {
    fn default() -> Self {
        Self::from_config(&SpecConfig::default())
    }
}

impl Grader for HeuristicSpecGrader {
    fn name(&self) -> &'static str {
        NAME
    }

    #[instrument(skip_all, fields(task_id = %input.task_id))]
    fn grade(&self, input: &GradeInput) -> Result<GradeResult, GradeError> {
        if input.content.trim().is_empty() {
            return Ok(GradeResult {
                message: "empty specification".to_string(),
                ..GradeResult::default()
            });
        }

        let criteria = score_criteria(&input.content);
        let total = self
            .weights
            .weighted_total(criteria.iter().map(|(name, c)| (*name, &c.score)));
        let passed = total >= self.passing_threshold;
        debug!(total, passed, "heuristic spec score");

        let mut details = criteria_details(&criteria);
        details.insert("total_score".to_string(), json!(total));
        details.insert(
            "passing_threshold".to_string(),
            json!(self.passing_threshold),
        );
        details.insert("grader".to_string(), json!(NAME));
        Ok(GradeResult {
            passed,
            score: total,
            message: format!(
                "heuristic score {total:.1} (threshold {:.1})",
                self.passing_threshold
            ),
            details,
        })
    }
}
