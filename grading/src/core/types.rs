//! Shared grading types.
//!
//! These types define the contracts between graders, the response parser and
//! the aggregator. They hold no I/O handles and are constructed once per trial.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Enumerated outcome of a single grading trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl Verdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Fail => "FAIL",
        }
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parses the exact uppercase tokens only; anything else is rejected.
impl FromStr for Verdict {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "PASS" => Ok(Verdict::Pass),
            "FAIL" => Ok(Verdict::Fail),
            _ => Err(()),
        }
    }
}

/// Output of a single grade call.
///
/// `Default` is the zero value: not passed, score 0, empty message and details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeResult {
    pub passed: bool,
    /// Score in `[0, 100]`.
    pub score: f64,
    pub message: String,
    #[serde(default)]
    pub details: BTreeMap<String, serde_json::Value>,
}

impl GradeResult {
    pub fn is_zero(&self) -> bool {
        *self == GradeResult::default()
    }
}

/// Score and feedback for one weighted dimension.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Criterion {
    pub score: f64,
    pub feedback: String,
}

/// Grader-specific context, one shape per grader kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GradeContext {
    #[default]
    None,
    CodeReview {
        task_description: String,
        #[serde(default)]
        acceptance_criteria: Vec<String>,
    },
    Spec {
        #[serde(default)]
        title: Option<String>,
    },
    Coverage {
        #[serde(default)]
        threshold_override: Option<f64>,
    },
}

impl GradeContext {
    pub fn kind(&self) -> &'static str {
        match self {
            GradeContext::None => "none",
            GradeContext::CodeReview { .. } => "code_review",
            GradeContext::Spec { .. } => "spec",
            GradeContext::Coverage { .. } => "coverage",
        }
    }
}

/// Artifact under evaluation for one trial.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradeInput {
    pub content: String,
    pub context: GradeContext,
    pub task_id: String,
    pub task_type: String,
    pub changed_files: Vec<String>,
    pub workdir: PathBuf,
}
