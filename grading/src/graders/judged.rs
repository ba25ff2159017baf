//! Bounded judge invocation shared by judge-backed graders.

use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, instrument, warn};

use super::GradeError;
use crate::io::judge::{CompletionOptions, CompletionRequest, JudgeClient, TransportError};

/// A judge client (possibly absent) plus the options and timeout for each call.
///
/// Holds only immutable configuration, so one handle may serve concurrent
/// grade calls.
#[derive(Clone)]
pub struct JudgeHandle {
    client: Option<Arc<dyn JudgeClient>>,
    options: CompletionOptions,
    timeout: Duration,
}

impl std::fmt::Debug for JudgeHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JudgeHandle")
            .field("configured", &self.client.is_some())
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl JudgeHandle {
    pub fn new(client: Arc<dyn JudgeClient>, options: CompletionOptions, timeout: Duration) -> Self {
        Self {
            client: Some(client),
            options,
            timeout,
        }
    }

    /// A handle with no transport; every call fails with `JudgeNotConfigured`.
    pub fn unconfigured(timeout: Duration) -> Self {
        Self {
            client: None,
            options: CompletionOptions::default(),
            timeout,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn options(&self) -> &CompletionOptions {
        &self.options
    }

    /// Make exactly one judge call, bounded by the configured timeout.
    ///
    /// The call runs on a worker thread; if it has not answered by the
    /// deadline the worker is abandoned and `Timeout` returned. The transport
    /// also receives the deadline and is expected to stop on its own.
    #[instrument(skip_all, fields(timeout_ms = self.timeout.as_millis() as u64, prompt_bytes = prompt.len()))]
    pub fn complete(&self, prompt: String) -> Result<String, GradeError> {
        let client = self.client.as_ref().ok_or(GradeError::JudgeNotConfigured)?;
        if self.timeout.is_zero() {
            return Err(self.timeout_error(None));
        }

        let request = CompletionRequest {
            prompt,
            options: self.options.clone(),
            deadline: Instant::now() + self.timeout,
        };
        let client = Arc::clone(client);
        let (tx, rx) = mpsc::sync_channel(1);
        thread::spawn(move || {
            let result = client.complete(&request);
            // The receiver is gone when the grader already timed out.
            let _ = tx.send(result);
        });

        match rx.recv_timeout(self.timeout) {
            Ok(Ok(text)) => {
                debug!(bytes = text.len(), "judge answered");
                Ok(text)
            }
            Ok(Err(err)) if err.is_timeout() => {
                warn!(err = %err, "judge transport hit deadline");
                Err(self.timeout_error(Some(err)))
            }
            Ok(Err(err)) => {
                warn!(err = %err, "judge transport failed");
                Err(GradeError::RequestFailed { source: err })
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!("judge did not answer before deadline");
                Err(self.timeout_error(None))
            }
            Err(RecvTimeoutError::Disconnected) => Err(GradeError::RequestFailed {
                source: TransportError::Other(anyhow::anyhow!("judge worker exited without a reply")),
            }),
        }
    }

    fn timeout_error(&self, source: Option<TransportError>) -> GradeError {
        GradeError::Timeout {
            timeout: self.timeout,
            source,
        }
    }
}
