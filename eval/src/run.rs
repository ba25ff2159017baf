//! Case execution orchestration.
//!
//! Builds the grader a case names, grades every item once per trial and
//! persists the trial records.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use grading::core::aggregate::AggregatedMetrics;
use grading::graders::code_review::CodeReviewGrader;
use grading::graders::coverage::CoverageGrader;
use grading::graders::spec_heuristic::HeuristicSpecGrader;
use grading::graders::spec_judge::JudgeSpecGrader;
use grading::graders::{Grader, JudgeHandle, evaluate};
use grading::io::config::{GraderConfig, JudgeConfig};
use grading::io::coverage_tool::CommandCoverageTool;
use grading::io::judge::CommandJudge;
use tracing::{debug, info, instrument};

use crate::case::{CaseFile, GraderKind};
use crate::config::apply_case_config;
use crate::outcome::classify_trial;
use crate::report::metrics_for;
use crate::results::{ItemTrials, RunMeta, file_sha256, new_run_id, write_run};

/// Result of running a case.
#[derive(Debug)]
pub struct RunOutcome {
    pub run_id: String,
    pub results_dir: PathBuf,
    pub metrics: AggregatedMetrics,
}

/// Build the grader named by a case from the merged configuration.
pub fn build_grader(kind: GraderKind, config: &GraderConfig) -> Box<dyn Grader> {
    match kind {
        GraderKind::SpecHeuristic => Box::new(HeuristicSpecGrader::from_config(&config.spec)),
        GraderKind::SpecJudge => Box::new(JudgeSpecGrader::new(
            command_judge(&config.judge),
            &config.spec,
        )),
        GraderKind::CodeReview => Box::new(CodeReviewGrader::new(
            command_judge(&config.judge),
            &config.code_review,
        )),
        GraderKind::Coverage => Box::new(CoverageGrader::new(
            Arc::new(CommandCoverageTool::from_config(&config.coverage)),
            &config.coverage,
        )),
    }
}

fn command_judge(config: &JudgeConfig) -> JudgeHandle {
    JudgeHandle::new(
        Arc::new(CommandJudge::from_config(config)),
        config.options(),
        config.timeout(),
    )
}

/// Run a case end-to-end with the grader its config describes.
pub fn run_case(
    repo_root: &Path,
    case_path: &Path,
    case: &CaseFile,
    base_config: GraderConfig,
    runs: u32,
) -> Result<RunOutcome> {
    let config = apply_case_config(base_config, &case.config).context("apply case config")?;
    let grader = build_grader(case.case.grader, &config);
    let results_base = repo_root.join("eval").join("results");
    run_case_with(&results_base, case_path, case, grader.as_ref(), runs)
}

/// Run a case with an already-built grader and write results under `results_base`.
#[instrument(skip_all, fields(case_id = %case.case.id, grader = grader.name(), runs = runs))]
pub fn run_case_with(
    results_base: &Path,
    case_path: &Path,
    case: &CaseFile,
    grader: &dyn Grader,
    runs: u32,
) -> Result<RunOutcome> {
    if runs == 0 {
        bail!("runs must be > 0");
    }
    info!("case run started");
    let started_at = Utc::now();
    let run_id = new_run_id(started_at);
    let case_dir = case_path.parent().unwrap_or_else(|| Path::new("."));

    let items = grade_items(grader, case, case_dir, runs)?;
    let finished_at = Utc::now();

    let mut meta = RunMeta {
        case_id: case.case.id.clone(),
        run_id: run_id.clone(),
        grader: grader.name().to_string(),
        case_hash: file_sha256(case_path).context("hash case file")?,
        runs,
        items: items.len(),
        start_time: String::new(),
        end_time: String::new(),
        duration_secs: 0.0,
    };
    meta.timing(started_at, finished_at);
    let results_dir = write_run(results_base, &meta, &items).context("write results")?;

    let metrics = metrics_for(&items);
    info!(
        accuracy = metrics.accuracy,
        duration_secs = meta.duration_secs,
        results_dir = %results_dir.display(),
        "case run complete"
    );
    Ok(RunOutcome {
        run_id,
        results_dir,
        metrics,
    })
}

/// Grade every item `runs` times. Grading failures become `ERROR` trials;
/// only a malformed item (e.g. unreadable content file) aborts the run.
pub fn grade_items(
    grader: &dyn Grader,
    case: &CaseFile,
    case_dir: &Path,
    runs: u32,
) -> Result<Vec<ItemTrials>> {
    let mut results = Vec::with_capacity(case.items.len());
    for item in &case.items {
        let input = item
            .grade_input(case.case.grader, case_dir)
            .with_context(|| format!("build input for item {}", item.id))?;
        let mut trials = Vec::with_capacity(runs as usize);
        for trial in 1..=runs {
            let started = Instant::now();
            let outcome = evaluate(grader, &input);
            let record = classify_trial(trial, outcome, started.elapsed().as_millis() as u64);
            debug!(
                item = %item.id,
                trial,
                verdict = record.verdict.as_str(),
                error = ?record.error,
                "trial graded"
            );
            trials.push(record);
        }
        results.push(ItemTrials {
            item_id: item.id.clone(),
            name: item.display_name().to_string(),
            category: item.category.clone(),
            expected: item.expected,
            trials,
        });
    }
    Ok(results)
}
