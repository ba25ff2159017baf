//! Test-only judges, coverage tools and input builders.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::coverage::CoverageReport;
use crate::core::criteria::CriterionName;
use crate::core::types::{GradeContext, GradeInput};
use crate::io::coverage_tool::CoverageTool;
use crate::io::judge::{CompletionRequest, JudgeClient, TransportError};

/// Returns scripted responses in order; errors once they run out.
pub struct ScriptedJudge {
    responses: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedJudge {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl JudgeClient for ScriptedJudge {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut responses = self
            .responses
            .lock()
            .map_err(|_| anyhow!("scripted judge lock poisoned"))?;
        responses
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted judge responses left").into())
    }
}

/// Returns the same response every call and records each prompt.
pub struct CapturingJudge {
    response: String,
    prompts: Mutex<Vec<String>>,
}

impl CapturingJudge {
    pub fn new(response: String) -> Self {
        Self {
            response,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

impl JudgeClient for CapturingJudge {
    fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(request.prompt.clone());
        Ok(self.response.clone())
    }
}

/// Sleeps past any reasonable test timeout, ignoring the request deadline.
pub struct HangingJudge {
    delay: Duration,
}

impl HangingJudge {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl JudgeClient for HangingJudge {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, TransportError> {
        thread::sleep(self.delay);
        Ok("VERDICT: PASS\nSCORE: 100\nREASONING: late".to_string())
    }
}

/// Fails every call with a fixed transport error.
pub struct FailingJudge {
    kind: FailureKind,
}

enum FailureKind {
    Deadline,
    Cancelled,
    Other(String),
}

impl FailingJudge {
    pub fn deadline() -> Self {
        Self {
            kind: FailureKind::Deadline,
        }
    }

    pub fn cancelled() -> Self {
        Self {
            kind: FailureKind::Cancelled,
        }
    }

    pub fn other(message: &str) -> Self {
        Self {
            kind: FailureKind::Other(message.to_string()),
        }
    }
}

impl JudgeClient for FailingJudge {
    fn complete(&self, _request: &CompletionRequest) -> Result<String, TransportError> {
        Err(match &self.kind {
            FailureKind::Deadline => TransportError::DeadlineExceeded,
            FailureKind::Cancelled => TransportError::Cancelled,
            FailureKind::Other(message) => TransportError::Other(anyhow!("{message}")),
        })
    }
}

/// Coverage tool returning a fixed report (or error) and counting calls.
pub struct FixedCoverage {
    report: Option<CoverageReport>,
    error: Option<String>,
    calls: AtomicUsize,
}

impl FixedCoverage {
    pub fn new(report: CoverageReport) -> Self {
        Self {
            report: Some(report),
            error: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            report: None,
            error: Some(message.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CoverageTool for FixedCoverage {
    fn measure(&self, _workdir: &Path, _changed_files: &[String]) -> Result<CoverageReport> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match (&self.report, &self.error) {
            (Some(report), _) => Ok(*report),
            (None, Some(message)) => Err(anyhow!("{message}")),
            (None, None) => Err(anyhow!("no coverage report configured")),
        }
    }
}

/// A well-formed multi-criterion response with scores in
/// clarity/completeness/testability/scope order.
pub fn criteria_response(scores: [f64; 4], summary: Option<&str>) -> String {
    let mut text = String::new();
    for (name, score) in CriterionName::ALL.iter().zip(scores) {
        text.push_str(&format!("{}: {}\n", name.score_key(), score));
        text.push_str(&format!(
            "{}: {} feedback\n",
            name.feedback_key(),
            name.label()
        ));
    }
    if let Some(summary) = summary {
        text.push_str(&format!("SUMMARY: {summary}\n"));
    }
    text
}

/// Code-review input with a task description and a diff.
pub fn code_review_input(task_description: &str, diff: &str) -> GradeInput {
    GradeInput {
        content: diff.to_string(),
        context: GradeContext::CodeReview {
            task_description: task_description.to_string(),
            acceptance_criteria: Vec::new(),
        },
        task_id: "task-1".to_string(),
        task_type: "feature".to_string(),
        changed_files: vec!["src/lib.rs".to_string()],
        ..GradeInput::default()
    }
}
