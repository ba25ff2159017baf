//! Grader configuration stored as TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::applicability::ApplicabilityRule;
use crate::core::criteria::GraderWeights;
use crate::io::judge::CompletionOptions;

/// Grader configuration (TOML).
///
/// Intended to be edited by humans. Missing fields fall back to defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GraderConfig {
    pub judge: JudgeConfig,
    pub spec: SpecConfig,
    pub code_review: CodeReviewConfig,
    pub coverage: CoverageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeConfig {
    /// Judge CLI; the prompt is written to its stdin (e.g. `["claude", "-p"]`).
    pub command: Vec<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    /// Wall-clock budget for one judge call.
    pub timeout_secs: u64,
    /// Truncate judge stdout/stderr beyond this many bytes.
    pub output_limit_bytes: usize,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            command: vec!["claude".to_string(), "-p".to_string()],
            model: None,
            max_tokens: Some(1024),
            timeout_secs: 120,
            output_limit_bytes: 100_000,
        }
    }
}

impl JudgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpecConfig {
    /// Minimum weighted total (inclusive) for a spec to pass.
    pub passing_threshold: f64,
    pub weights: GraderWeights,
    /// Truncate the spec embedded in judge prompts beyond this many bytes.
    pub prompt_budget_bytes: usize,
}

impl Default for SpecConfig {
    fn default() -> Self {
        Self {
            passing_threshold: 70.0,
            weights: GraderWeights::default(),
            prompt_budget_bytes: 40_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CodeReviewConfig {
    /// Truncate the diff embedded in judge prompts beyond this many bytes.
    pub prompt_budget_bytes: usize,
}

impl Default for CodeReviewConfig {
    fn default() -> Self {
        Self {
            prompt_budget_bytes: 60_000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CoverageConfig {
    /// Coverage command. An argument equal to `{files}` expands to the changed
    /// files; they are also exported as `COVERAGE_FILES`.
    pub command: Vec<String>,
    /// Minimum coverage percentage (inclusive).
    pub threshold: f64,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
    #[serde(flatten)]
    pub applicability: ApplicabilityRule,
}

impl Default for CoverageConfig {
    fn default() -> Self {
        Self {
            command: vec!["cargo".to_string(), "llvm-cov".to_string(), "--summary-only".to_string()],
            threshold: 80.0,
            timeout_secs: 10 * 60,
            output_limit_bytes: 200_000,
            applicability: ApplicabilityRule::default(),
        }
    }
}

impl CoverageConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl GraderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.judge.command.is_empty() || self.judge.command[0].trim().is_empty() {
            return Err(anyhow!("judge.command must be a non-empty array"));
        }
        if self.judge.timeout_secs == 0 {
            return Err(anyhow!("judge.timeout_secs must be > 0"));
        }
        if self.judge.output_limit_bytes == 0 {
            return Err(anyhow!("judge.output_limit_bytes must be > 0"));
        }
        validate_percent("spec.passing_threshold", self.spec.passing_threshold)?;
        for (name, weight) in self.spec.weights.entries() {
            if !weight.is_finite() || weight < 0.0 {
                return Err(anyhow!("spec.weights.{} must be >= 0", name.label()));
            }
        }
        if self.spec.prompt_budget_bytes == 0 {
            return Err(anyhow!("spec.prompt_budget_bytes must be > 0"));
        }
        if self.code_review.prompt_budget_bytes == 0 {
            return Err(anyhow!("code_review.prompt_budget_bytes must be > 0"));
        }
        if self.coverage.command.is_empty() || self.coverage.command[0].trim().is_empty() {
            return Err(anyhow!("coverage.command must be a non-empty array"));
        }
        validate_percent("coverage.threshold", self.coverage.threshold)?;
        if self.coverage.timeout_secs == 0 {
            return Err(anyhow!("coverage.timeout_secs must be > 0"));
        }
        if self.coverage.output_limit_bytes == 0 {
            return Err(anyhow!("coverage.output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

fn validate_percent(field: &str, value: f64) -> Result<()> {
    if !(0.0..=100.0).contains(&value) {
        return Err(anyhow!("{field} must be within [0, 100], got {value}"));
    }
    Ok(())
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `GraderConfig::default()`.
pub fn load_config(path: &Path) -> Result<GraderConfig> {
    if !path.exists() {
        let cfg = GraderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: GraderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}
