//! Graders turn a [`GradeInput`] into a [`GradeResult`].
//!
//! Four graders are provided:
//!
//! - [`spec_heuristic::HeuristicSpecGrader`]: deterministic, never errors.
//! - [`spec_judge::JudgeSpecGrader`]: multi-criterion spec grading by a judge.
//! - [`code_review::CodeReviewGrader`]: binary-verdict review of a diff by a judge.
//! - [`coverage::CoverageGrader`]: compares measured coverage with a threshold.
//!
//! Judge-backed graders and the heuristic grader are selected explicitly and
//! never substitute for each other.

use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use crate::core::applicability::Applicability;
use crate::core::response::ParseError;
use crate::core::types::{GradeInput, GradeResult};
use crate::io::judge::TransportError;

pub mod code_review;
pub mod coverage;
mod judged;
pub mod spec_heuristic;
pub mod spec_judge;

pub use judged::JudgeHandle;

/// Grading failures. On error there is no result; callers use the zero
/// [`GradeResult`] when they need a placeholder.
#[derive(Debug, Error)]
pub enum GradeError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("judge client not initialized")]
    JudgeNotConfigured,
    #[error("judge request timed out after {timeout:?}")]
    Timeout {
        timeout: Duration,
        #[source]
        source: Option<TransportError>,
    },
    #[error("judge request failed")]
    RequestFailed {
        #[source]
        source: TransportError,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("coverage measurement failed")]
    Coverage(#[source] anyhow::Error),
}

impl GradeError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, GradeError::Timeout { .. })
    }
}

/// Outcome of [`evaluate`]: a grade, or a non-error skip.
#[derive(Debug, Clone, PartialEq)]
pub enum GradeOutcome {
    Graded(GradeResult),
    Skipped { reason: String },
}

/// A grader for one kind of artifact.
pub trait Grader: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this grader applies to `input`. Defaults to always.
    fn applicability(&self, _input: &GradeInput) -> Applicability {
        Applicability::Applies
    }

    fn grade(&self, input: &GradeInput) -> Result<GradeResult, GradeError>;
}

/// Check applicability, then grade. A skip never reaches `grade`.
pub fn evaluate<G: Grader + ?Sized>(
    grader: &G,
    input: &GradeInput,
) -> Result<GradeOutcome, GradeError> {
    match grader.applicability(input) {
        Applicability::Skip { reason } => {
            debug!(grader = grader.name(), task_id = %input.task_id, reason = %reason, "grader skipped");
            Ok(GradeOutcome::Skipped { reason })
        }
        Applicability::Applies => grader.grade(input).map(GradeOutcome::Graded),
    }
}

fn require_content(input: &GradeInput) -> Result<&str, GradeError> {
    let content = input.content.trim();
    if content.is_empty() {
        return Err(GradeError::InvalidInput("content must be non-empty".to_string()));
    }
    Ok(content)
}
