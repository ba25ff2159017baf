//! Weighted criteria used by multi-criterion spec grading.

use serde::{Deserialize, Serialize};

/// One dimension of a multi-criterion grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionName {
    Clarity,
    Completeness,
    Testability,
    Scope,
}

impl CriterionName {
    pub const ALL: [CriterionName; 4] = [
        CriterionName::Clarity,
        CriterionName::Completeness,
        CriterionName::Testability,
        CriterionName::Scope,
    ];

    /// Lowercase name used in details and config.
    pub fn label(&self) -> &'static str {
        match self {
            CriterionName::Clarity => "clarity",
            CriterionName::Completeness => "completeness",
            CriterionName::Testability => "testability",
            CriterionName::Scope => "scope",
        }
    }

    /// Response key carrying the numeric score.
    pub fn score_key(&self) -> &'static str {
        match self {
            CriterionName::Clarity => "CLARITY",
            CriterionName::Completeness => "COMPLETENESS",
            CriterionName::Testability => "TESTABILITY",
            CriterionName::Scope => "SCOPE",
        }
    }

    /// Response key carrying the free-text feedback.
    pub fn feedback_key(&self) -> &'static str {
        match self {
            CriterionName::Clarity => "CLARITY_FEEDBACK",
            CriterionName::Completeness => "COMPLETENESS_FEEDBACK",
            CriterionName::Testability => "TESTABILITY_FEEDBACK",
            CriterionName::Scope => "SCOPE_FEEDBACK",
        }
    }
}

/// Criterion weights. Callers keep the sum at 1.0; it is not checked at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderWeights {
    pub clarity: f64,
    pub completeness: f64,
    pub testability: f64,
    pub scope: f64,
}

impl Default for GraderWeights {
    fn default() -> Self {
        Self {
            clarity: 0.30,
            completeness: 0.25,
            testability: 0.25,
            scope: 0.20,
        }
    }
}

impl GraderWeights {
    pub fn weight(&self, name: CriterionName) -> f64 {
        match name {
            CriterionName::Clarity => self.clarity,
            CriterionName::Completeness => self.completeness,
            CriterionName::Testability => self.testability,
            CriterionName::Scope => self.scope,
        }
    }

    /// Weights in fixed criterion order.
    pub fn entries(&self) -> [(CriterionName, f64); 4] {
        CriterionName::ALL.map(|name| (name, self.weight(name)))
    }

    pub fn sum(&self) -> f64 {
        self.entries().iter().map(|(_, weight)| weight).sum()
    }

    /// Weighted sum over the provided criterion scores.
    pub fn weighted_total<'a, I>(&self, scores: I) -> f64
    where
        I: IntoIterator<Item = (CriterionName, &'a f64)>,
    {
        scores
            .into_iter()
            .map(|(name, score)| self.weight(name) * score)
            .sum()
    }
}
