//! Judge prompt rendering.
//!
//! Templates embed the artifact under evaluation, the rubric and the exact
//! response schema the parser expects. Large artifacts are cut to a byte
//! budget so the prompt stays bounded.

use anyhow::Result;
use minijinja::{Environment, context};
use serde::Serialize;
use tracing::debug;

use crate::core::criteria::{CriterionName, GraderWeights};

const CODE_REVIEW_TEMPLATE: &str = include_str!("prompts/code_review.md");
const SPEC_REVIEW_TEMPLATE: &str = include_str!("prompts/spec_review.md");

/// Inputs for the code-review prompt.
#[derive(Debug, Clone)]
pub struct CodeReviewPrompt<'a> {
    pub task_description: &'a str,
    pub acceptance_criteria: &'a [String],
    pub changed_files: &'a [String],
    pub diff: &'a str,
    pub budget_bytes: usize,
}

/// Inputs for the spec-review prompt.
#[derive(Debug, Clone)]
pub struct SpecReviewPrompt<'a> {
    pub title: Option<&'a str>,
    pub spec: &'a str,
    pub weights: &'a GraderWeights,
    pub passing_threshold: f64,
    pub budget_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
struct CriterionContext {
    key: &'static str,
    feedback_key: &'static str,
    weight: f64,
    description: &'static str,
}

fn describe(name: CriterionName) -> &'static str {
    match name {
        CriterionName::Clarity => "is the intended outcome stated unambiguously",
        CriterionName::Completeness => "does it carry the detail needed to implement it",
        CriterionName::Testability => "can completion be verified by concrete checks",
        CriterionName::Scope => "is it sized as a single focused task",
    }
}

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("code_review", CODE_REVIEW_TEMPLATE)
            .expect("code_review template should be valid");
        env.add_template("spec_review", SPEC_REVIEW_TEMPLATE)
            .expect("spec_review template should be valid");
        Self { env }
    }
}

/// Render the code-review prompt.
pub fn render_code_review(input: &CodeReviewPrompt<'_>) -> Result<String> {
    let engine = PromptEngine::new();
    let template = engine.env.get_template("code_review")?;
    let rendered = template.render(context! {
        task_description => input.task_description.trim(),
        acceptance_criteria => input.acceptance_criteria,
        changed_files => input.changed_files,
        diff => truncate_to_budget(input.diff, input.budget_bytes),
    })?;
    Ok(rendered)
}

/// Render the spec-review prompt.
pub fn render_spec_review(input: &SpecReviewPrompt<'_>) -> Result<String> {
    let engine = PromptEngine::new();
    let criteria: Vec<CriterionContext> = input
        .weights
        .entries()
        .into_iter()
        .map(|(name, weight)| CriterionContext {
            key: name.score_key(),
            feedback_key: name.feedback_key(),
            weight,
            description: describe(name),
        })
        .collect();
    let template = engine.env.get_template("spec_review")?;
    let rendered = template.render(context! {
        title => input.title.map(str::trim).filter(|s| !s.is_empty()),
        spec => truncate_to_budget(input.spec, input.budget_bytes),
        criteria => criteria,
        passing_threshold => input.passing_threshold,
    })?;
    Ok(rendered)
}

/// Cut `text` to at most `budget` bytes on a char boundary, noting what was dropped.
pub fn truncate_to_budget(text: &str, budget: usize) -> String {
    let text = text.trim();
    if text.len() <= budget {
        return text.to_string();
    }
    let mut end = budget;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let dropped = text.len() - end;
    debug!(bytes_dropped = dropped, "truncated prompt artifact");
    format!("{}\n[truncated {} bytes]", &text[..end], dropped)
}
