//! Judge transport abstraction.
//!
//! The [`JudgeClient`] trait decouples graders from the model backend. The
//! grader supplies the prompt, opaque options and a deadline; the transport
//! returns completion text or a [`TransportError`] that distinguishes deadline
//! expiry from any other failure. Tests use scripted clients that return
//! predetermined text without spawning processes.

use std::process::Command;
use std::time::{Duration, Instant};

use anyhow::anyhow;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::core::budget::remaining_budget;
use crate::io::config::JudgeConfig;
use crate::io::process::run_command_with_timeout;

/// Options forwarded to the transport without interpretation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionOptions {
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
}

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub options: CompletionOptions,
    /// Instant after which the transport must give up.
    pub deadline: Instant,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("deadline exceeded")]
    DeadlineExceeded,
    #[error("request cancelled")]
    Cancelled,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransportError {
    /// Deadline expiry and cancellation are both timeouts to the grader.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            TransportError::DeadlineExceeded | TransportError::Cancelled
        )
    }
}

/// Abstraction over judge backends. Implementations are shared across threads.
pub trait JudgeClient: Send + Sync {
    fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError>;
}

/// Judge backed by a CLI that reads the prompt on stdin and prints the answer.
///
/// Options reach the child as `JUDGE_MODEL` and `JUDGE_MAX_TOKENS`.
#[derive(Debug, Clone)]
pub struct CommandJudge {
    command: Vec<String>,
    output_limit_bytes: usize,
}

impl CommandJudge {
    pub fn new(command: Vec<String>, output_limit_bytes: usize) -> Self {
        Self {
            command,
            output_limit_bytes,
        }
    }

    pub fn from_config(config: &JudgeConfig) -> Self {
        Self::new(config.command.clone(), config.output_limit_bytes)
    }
}

impl JudgeClient for CommandJudge {
    #[instrument(skip_all, fields(program = self.command.first().map(String::as_str).unwrap_or("")))]
    fn complete(&self, request: &CompletionRequest) -> Result<String, TransportError> {
        let Some((program, args)) = self.command.split_first() else {
            return Err(anyhow!("judge command is empty").into());
        };
        let budget: Duration =
            remaining_budget(request.deadline).map_err(|_| TransportError::DeadlineExceeded)?;

        let mut cmd = Command::new(program);
        cmd.args(args);
        if let Some(model) = &request.options.model {
            cmd.env("JUDGE_MODEL", model);
        }
        if let Some(max_tokens) = request.options.max_tokens {
            cmd.env("JUDGE_MAX_TOKENS", max_tokens.to_string());
        }

        info!(budget_ms = budget.as_millis() as u64, "starting judge command");
        let output = run_command_with_timeout(
            cmd,
            Some(request.prompt.as_bytes()),
            budget,
            self.output_limit_bytes,
        )?;

        if output.timed_out {
            warn!(budget_ms = budget.as_millis() as u64, "judge command timed out");
            return Err(TransportError::DeadlineExceeded);
        }
        if !output.status.success() {
            warn!(exit_code = ?output.status.code(), "judge command failed");
            return Err(anyhow!(
                "judge command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_summary()
            )
            .into());
        }

        if output.stdout_truncated > 0 {
            warn!(
                truncated_bytes = output.stdout_truncated,
                limit = self.output_limit_bytes,
                "judge output truncated"
            );
            return Err(anyhow!(
                "judge output exceeded {} bytes ({} bytes dropped)",
                self.output_limit_bytes,
                output.stdout_truncated
            )
            .into());
        }

        debug!(bytes = output.stdout.len(), "judge command completed");
        Ok(output.stdout_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["sh".to_string(), "-c".to_string(), script.to_string()]
    }

    fn request(timeout: Duration) -> CompletionRequest {
        CompletionRequest {
            prompt: "grade this".to_string(),
            options: CompletionOptions {
                model: Some("judge-small".to_string()),
                max_tokens: Some(256),
            },
            deadline: Instant::now() + timeout,
        }
    }

    #[test]
    fn returns_stdout_and_forwards_options() {
        let judge = CommandJudge::new(
            sh("cat >/dev/null; printf 'model=%s tokens=%s' \"$JUDGE_MODEL\" \"$JUDGE_MAX_TOKENS\""),
            1024,
        );
        let text = judge
            .complete(&request(Duration::from_secs(5)))
            .expect("complete");
        assert_eq!(text, "model=judge-small tokens=256");
    }

    #[test]
    fn reads_prompt_from_stdin() {
        let judge = CommandJudge::new(sh("cat"), 1024);
        let text = judge
            .complete(&request(Duration::from_secs(5)))
            .expect("complete");
        assert_eq!(text, "grade this");
    }

    #[test]
    fn non_zero_exit_is_other_error() {
        let judge = CommandJudge::new(sh("echo boom >&2; exit 3"), 1024);
        let err = judge
            .complete(&request(Duration::from_secs(5)))
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn truncated_output_is_rejected() {
        let judge = CommandJudge::new(
            sh("cat >/dev/null; printf 'VERDICT: PASS\\nSCORE: 90\\nREASONING: long'"),
            16,
        );
        let err = judge
            .complete(&request(Duration::from_secs(5)))
            .unwrap_err();
        assert!(!err.is_timeout());
        assert!(err.to_string().contains("exceeded 16 bytes"));
    }

    #[test]
    fn slow_command_exceeds_deadline() {
        let judge = CommandJudge::new(sh("sleep 5"), 1024);
        let err = judge
            .complete(&request(Duration::from_millis(100)))
            .unwrap_err();
        assert!(matches!(err, TransportError::DeadlineExceeded));
    }

    #[test]
    fn empty_command_is_rejected() {
        let judge = CommandJudge::new(Vec::new(), 1024);
        let err = judge
            .complete(&request(Duration::from_secs(1)))
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }
}
