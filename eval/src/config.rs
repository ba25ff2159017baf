//! Grader configuration merging.
//!
//! Applies case-specific overrides to the base grader configuration.

use anyhow::Result;
use grading::io::config::GraderConfig;

use crate::case::CaseConfig;

/// Apply case configuration overrides to the base grader config.
pub fn apply_case_config(mut base: GraderConfig, overrides: &CaseConfig) -> Result<GraderConfig> {
    if let Some(threshold) = overrides.passing_threshold {
        base.spec.passing_threshold = threshold;
    }
    if let Some(threshold) = overrides.coverage_threshold {
        base.coverage.threshold = threshold;
    }
    if let Some(judge) = &overrides.judge {
        if let Some(command) = &judge.command {
            base.judge.command = command.clone();
        }
        if let Some(model) = &judge.model {
            base.judge.model = Some(model.clone());
        }
        if let Some(timeout_secs) = judge.timeout_secs {
            base.judge.timeout_secs = timeout_secs;
        }
    }
    base.validate()?;
    Ok(base)
}
