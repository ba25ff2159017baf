//! Coverage tool invocation.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Result, anyhow, bail};
use tracing::{debug, instrument, warn};

use crate::core::coverage::{CoverageReport, parse_coverage_output};
use crate::io::config::CoverageConfig;
use crate::io::process::run_command_with_timeout;

/// Measures test coverage of the changed files in a working directory.
pub trait CoverageTool: Send + Sync {
    fn measure(&self, workdir: &Path, changed_files: &[String]) -> Result<CoverageReport>;
}

/// Command argument replaced by the changed files, one argument per file.
pub const FILES_PLACEHOLDER: &str = "{files}";

/// Coverage tool that runs a configured command and parses its stdout.
///
/// Changed files reach the child in place of a [`FILES_PLACEHOLDER`] argument
/// (omitted when the command has none) and as newline-separated
/// `COVERAGE_FILES` in its environment.
#[derive(Debug, Clone)]
pub struct CommandCoverageTool {
    command: Vec<String>,
    timeout: Duration,
    output_limit_bytes: usize,
}

impl CommandCoverageTool {
    pub fn new(command: Vec<String>, timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            command,
            timeout,
            output_limit_bytes,
        }
    }

    pub fn from_config(config: &CoverageConfig) -> Self {
        Self::new(
            config.command.clone(),
            config.timeout(),
            config.output_limit_bytes,
        )
    }
}

impl CoverageTool for CommandCoverageTool {
    #[instrument(skip_all, fields(workdir = %workdir.display(), files = changed_files.len()))]
    fn measure(&self, workdir: &Path, changed_files: &[String]) -> Result<CoverageReport> {
        let Some((program, args)) = self.command.split_first() else {
            bail!("coverage command is empty");
        };
        let mut cmd = Command::new(program);
        for arg in args {
            if arg == FILES_PLACEHOLDER {
                cmd.args(changed_files);
            } else {
                cmd.arg(arg);
            }
        }
        cmd.env("COVERAGE_FILES", changed_files.join("\n"))
            .current_dir(workdir);

        let output =
            run_command_with_timeout(cmd, None, self.timeout, self.output_limit_bytes)?;
        if output.timed_out {
            warn!(timeout_secs = self.timeout.as_secs(), "coverage command timed out");
            bail!("coverage command timed out after {:?}", self.timeout);
        }
        let stdout = output.stdout_lossy();
        // Some tools report "no test files" with a non-zero exit.
        if let Some(CoverageReport::NoTestFiles) = parse_coverage_output(&stdout) {
            return Ok(CoverageReport::NoTestFiles);
        }
        if !output.status.success() {
            bail!(
                "coverage command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_summary()
            );
        }
        let report = parse_coverage_output(&stdout)
            .ok_or_else(|| anyhow!("coverage output has no percentage"))?;
        debug!(report = ?report, "coverage measured");
        Ok(report)
    }
}
