//! Case file parsing and validation.
//!
//! A case names one grader and lists the items it grades, each with the
//! verdict a correct grader should reach. See `eval/cases/` for examples.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use grading::core::types::{GradeContext, GradeInput, Verdict};
use serde::Deserialize;

/// A parsed case file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseFile {
    pub case: CaseMeta,
    #[serde(default)]
    pub config: CaseConfig,
    #[serde(default)]
    pub items: Vec<CaseItem>,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct CaseMeta {
    /// Unique identifier (slug format: `[a-z0-9_-]+`).
    pub id: String,
    pub grader: GraderKind,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GraderKind {
    SpecHeuristic,
    SpecJudge,
    CodeReview,
    Coverage,
}

impl GraderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            GraderKind::SpecHeuristic => "spec_heuristic",
            GraderKind::SpecJudge => "spec_judge",
            GraderKind::CodeReview => "code_review",
            GraderKind::Coverage => "coverage",
        }
    }

    pub fn uses_judge(&self) -> bool {
        matches!(self, GraderKind::SpecJudge | GraderKind::CodeReview)
    }
}

/// Grader configuration overrides for the case.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaseConfig {
    /// Spec passing threshold override.
    pub passing_threshold: Option<f64>,
    pub coverage_threshold: Option<f64>,
    pub judge: Option<JudgeOverride>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeOverride {
    pub command: Option<Vec<String>>,
    pub model: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// One graded item.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CaseItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_category")]
    pub category: String,
    pub expected: Verdict,
    #[serde(default)]
    pub task_type: String,
    pub content: Option<String>,
    /// Read relative to the case file's directory.
    pub content_file: Option<PathBuf>,
    #[serde(default)]
    pub changed_files: Vec<String>,
    pub workdir: Option<PathBuf>,
    pub title: Option<String>,
    pub task_description: Option<String>,
    #[serde(default)]
    pub acceptance_criteria: Vec<String>,
    pub threshold_override: Option<f64>,
}

fn default_category() -> String {
    "uncategorized".to_string()
}

impl CaseItem {
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            &self.id
        } else {
            &self.name
        }
    }

    /// Build the grader input for this item.
    pub fn grade_input(&self, kind: GraderKind, case_dir: &Path) -> Result<GradeInput> {
        let content = match (&self.content, &self.content_file) {
            (Some(content), _) => content.clone(),
            (None, Some(file)) => {
                let path = case_dir.join(file);
                fs::read_to_string(&path)
                    .with_context(|| format!("read content_file {}", path.display()))?
            }
            (None, None) => String::new(),
        };
        let context = match kind {
            GraderKind::SpecHeuristic | GraderKind::SpecJudge => GradeContext::Spec {
                title: self.title.clone(),
            },
            GraderKind::CodeReview => GradeContext::CodeReview {
                task_description: self.task_description.clone().unwrap_or_default(),
                acceptance_criteria: self.acceptance_criteria.clone(),
            },
            GraderKind::Coverage => GradeContext::Coverage {
                threshold_override: self.threshold_override,
            },
        };
        let workdir = match &self.workdir {
            Some(dir) => case_dir.join(dir),
            None => case_dir.to_path_buf(),
        };
        Ok(GradeInput {
            content,
            context,
            task_id: self.id.clone(),
            task_type: self.task_type.clone(),
            changed_files: self.changed_files.clone(),
            workdir,
        })
    }

    fn validate(&self, kind: GraderKind) -> Result<()> {
        validate_slug("id", &self.id)?;
        if self.category.trim().is_empty() {
            bail!("category must be non-empty");
        }
        if self.content.is_some() && self.content_file.is_some() {
            bail!("content and content_file are mutually exclusive");
        }
        if kind.uses_judge() && self.content.is_none() && self.content_file.is_none() {
            bail!("{} items need content or content_file", kind.as_str());
        }
        if kind == GraderKind::CodeReview
            && self
                .task_description
                .as_deref()
                .is_none_or(|desc| desc.trim().is_empty())
        {
            bail!("code_review items need task_description");
        }
        if let Some(threshold) = self.threshold_override
            && !(0.0..=100.0).contains(&threshold)
        {
            bail!("threshold_override must be within [0, 100]");
        }
        Ok(())
    }
}

impl CaseFile {
    /// Load and validate a case file from the given path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("read case {}", path.display()))?;
        Self::parse_str(&contents).with_context(|| format!("load case {}", path.display()))
    }

    pub fn parse_str(contents: &str) -> Result<Self> {
        let case: CaseFile = toml::from_str(contents).context("parse case")?;
        case.validate()?;
        Ok(case)
    }

    fn validate(&self) -> Result<()> {
        validate_slug("case.id", &self.case.id)?;
        if let Some(threshold) = self.config.passing_threshold
            && !(0.0..=100.0).contains(&threshold)
        {
            bail!("config.passing_threshold must be within [0, 100]");
        }
        if let Some(threshold) = self.config.coverage_threshold
            && !(0.0..=100.0).contains(&threshold)
        {
            bail!("config.coverage_threshold must be within [0, 100]");
        }
        if let Some(judge) = &self.config.judge {
            if let Some(command) = &judge.command
                && (command.is_empty() || command[0].trim().is_empty())
            {
                bail!("config.judge.command must be a non-empty array");
            }
            if judge.timeout_secs == Some(0) {
                bail!("config.judge.timeout_secs must be > 0");
            }
        }
        if self.items.is_empty() {
            bail!("items must be a non-empty array");
        }
        for (index, item) in self.items.iter().enumerate() {
            item.validate(self.case.grader)
                .with_context(|| format!("items[{index}] invalid"))?;
        }
        let mut ids: Vec<&str> = self.items.iter().map(|item| item.id.as_str()).collect();
        ids.sort_unstable();
        for pair in ids.windows(2) {
            if pair[0] == pair[1] {
                bail!("duplicate item id {}", pair[0]);
            }
        }
        Ok(())
    }
}

/// Discover and load all case files from a directory.
///
/// Returns cases sorted by id. Errors if duplicate ids are found.
pub fn discover_cases(dir: &Path) -> Result<Vec<CaseFile>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut cases = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("read cases dir {}", dir.display()))? {
        let entry = entry.context("read case entry")?;
        let path = entry.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("toml") {
            continue;
        }
        cases.push(CaseFile::load(&path)?);
    }
    cases.sort_by(|left, right| left.case.id.cmp(&right.case.id));
    for pair in cases.windows(2) {
        if pair[0].case.id == pair[1].case.id {
            return Err(anyhow!("duplicate case.id {}", pair[0].case.id));
        }
    }
    Ok(cases)
}

/// Validate an identifier used in result paths.
pub fn validate_slug(field: &str, id: &str) -> Result<()> {
    if id.trim().is_empty() {
        bail!("{field} must be non-empty");
    }
    if id.contains('/') || id.contains('\\') {
        bail!("{field} must not contain path separators");
    }
    if id.contains("..") {
        bail!("{field} must not contain '..'");
    }
    if !id
        .chars()
        .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' || ch == '_')
    {
        bail!("{field} must use [a-z0-9_-] only");
    }
    Ok(())
}
