//! Applicability gate evaluated before a grader runs.
//!
//! A non-applicable input is a successful outcome carrying a skip reason, not an
//! error, and must not reach the judge or the coverage tool.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::types::GradeInput;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applicability {
    Applies,
    Skip { reason: String },
}

impl Applicability {
    pub fn applies(&self) -> bool {
        matches!(self, Applicability::Applies)
    }
}

/// Task-type deny-list plus changed-file extension membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplicabilityRule {
    /// Task types that never apply (compared case-insensitively).
    pub denied_task_types: Vec<String>,
    /// File extensions with a leading dot (e.g. `.rs`). Empty means any file.
    pub extensions: Vec<String>,
}

impl Default for ApplicabilityRule {
    fn default() -> Self {
        Self {
            denied_task_types: vec!["chore".to_string(), "spike".to_string()],
            extensions: [".rs", ".go", ".py", ".ts", ".js"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
        }
    }
}

impl ApplicabilityRule {
    /// Rule that applies to every input.
    pub fn always() -> Self {
        Self {
            denied_task_types: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn check(&self, input: &GradeInput) -> Applicability {
        let task_type = input.task_type.trim();
        if self
            .denied_task_types
            .iter()
            .any(|denied| denied.eq_ignore_ascii_case(task_type))
        {
            return Applicability::Skip {
                reason: format!("task type {task_type:?} is not graded"),
            };
        }
        if self.extensions.is_empty() {
            return Applicability::Applies;
        }
        if input
            .changed_files
            .iter()
            .any(|file| self.matches_extension(file))
        {
            Applicability::Applies
        } else {
            Applicability::Skip {
                reason: format!(
                    "no changed files with extensions {}",
                    self.extensions.join(", ")
                ),
            }
        }
    }

    fn matches_extension(&self, file: &str) -> bool {
        let Some(ext) = Path::new(file).extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(task_type: &str, files: &[&str]) -> GradeInput {
        GradeInput {
            task_type: task_type.to_string(),
            changed_files: files.iter().map(|file| file.to_string()).collect(),
            ..GradeInput::default()
        }
    }

    #[test]
    fn denied_task_types_skip() {
        let rule = ApplicabilityRule::default();
        let outcome = rule.check(&input("Chore", &["src/lib.rs"]));
        assert!(matches!(outcome, Applicability::Skip { ref reason } if reason.contains("Chore")));
        assert!(!rule.check(&input("spike", &["main.go"])).applies());
    }

    #[test]
    fn requires_matching_extension() {
        let rule = ApplicabilityRule::default();
        assert!(rule.check(&input("feature", &["README.md", "src/lib.rs"])).applies());
        let outcome = rule.check(&input("feature", &["README.md", "Makefile"]));
        assert!(matches!(outcome, Applicability::Skip { ref reason } if reason.contains(".rs")));
        assert!(!rule.check(&input("feature", &[])).applies());
    }

    #[test]
    fn empty_extension_list_applies_to_any_file() {
        let rule = ApplicabilityRule {
            denied_task_types: vec!["docs".to_string()],
            extensions: Vec::new(),
        };
        assert!(rule.check(&input("feature", &[])).applies());
        assert!(!rule.check(&input("docs", &[])).applies());
        assert!(ApplicabilityRule::always().check(&input("chore", &[])).applies());
    }
}
