//! Per-trial outcome classification.

use grading::core::types::{GradeResult, Verdict};
use grading::graders::{GradeError, GradeOutcome};
use serde::{Deserialize, Serialize};

/// Recorded verdict for one trial.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrialVerdict {
    Pass,
    Fail,
    Skip,
    Error,
}

impl TrialVerdict {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrialVerdict::Pass => "PASS",
            TrialVerdict::Fail => "FAIL",
            TrialVerdict::Skip => "SKIP",
            TrialVerdict::Error => "ERROR",
        }
    }

    /// Whether this trial reached the item's expected verdict.
    pub fn matches(&self, expected: Verdict) -> bool {
        self.as_str() == expected.as_str()
    }
}

/// One graded trial as persisted in `trials.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrialRecord {
    pub trial: u32,
    pub verdict: TrialVerdict,
    /// Zero value for skipped and errored trials.
    pub result: GradeResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

pub fn classify_trial(
    trial: u32,
    outcome: Result<GradeOutcome, GradeError>,
    duration_ms: u64,
) -> TrialRecord {
    let (verdict, result, skip_reason, error) = match outcome {
        Ok(GradeOutcome::Graded(result)) => {
            let verdict = if result.passed {
                TrialVerdict::Pass
            } else {
                TrialVerdict::Fail
            };
            (verdict, result, None, None)
        }
        Ok(GradeOutcome::Skipped { reason }) => {
            (TrialVerdict::Skip, GradeResult::default(), Some(reason), None)
        }
        Err(err) => (
            TrialVerdict::Error,
            GradeResult::default(),
            None,
            Some(format!("{:#}", anyhow::Error::new(err))),
        ),
    };
    TrialRecord {
        trial,
        verdict,
        result,
        skip_reason,
        error,
        duration_ms,
    }
}
