//! CLI command implementations.

use std::path::Path;

use anyhow::{Context, Result, bail};
use grading::io::config::load_config;
use tracing::{debug, info};

use crate::case::{CaseFile, discover_cases, validate_slug};
use crate::report::{ReportFormat, load_metrics, render};
use crate::results::{latest_run_dir, results_dir};
use crate::run::run_case;

fn cases_dir(repo_root: &Path) -> std::path::PathBuf {
    repo_root.join("eval").join("cases")
}

fn case_results_dir(repo_root: &Path, case_id: &str) -> std::path::PathBuf {
    repo_root.join("eval").join("results").join(case_id)
}

/// List all available cases.
pub fn list_cases(repo_root: &Path) -> Result<()> {
    for case in discover_cases(&cases_dir(repo_root))? {
        println!(
            "{}\t{}\t{} items",
            case.case.id,
            case.case.grader.as_str(),
            case.items.len()
        );
    }
    Ok(())
}

/// Run a case by id `runs` times per item.
pub fn run_case_by_id(
    repo_root: &Path,
    case_id: &str,
    runs: u32,
    config_path: Option<&Path>,
) -> Result<()> {
    validate_slug("case id", case_id)?;
    let case_path = cases_dir(repo_root).join(format!("{case_id}.toml"));
    if !case_path.exists() {
        bail!("case {} not found at {}", case_id, case_path.display());
    }
    let case = CaseFile::load(&case_path).context("load case")?;
    let config_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| repo_root.join("eval").join("grader.toml"));
    let config = load_config(&config_path).context("load grader config")?;
    debug!(case_id, runs, config = %config_path.display(), "case loaded");

    info!(case_id, runs, "starting runs");
    let outcome = run_case(repo_root, &case_path, &case, config, runs).context("run case")?;
    println!(
        "run: case={} run_id={} results={}",
        case_id,
        outcome.run_id,
        outcome.results_dir.display()
    );
    print!("{}", outcome.metrics.render_table());
    Ok(())
}

/// Show aggregated metrics for the latest (or a given) run of a case.
pub fn report_case(
    repo_root: &Path,
    case_id: &str,
    run_id: Option<&str>,
    format: ReportFormat,
) -> Result<()> {
    validate_slug("case id", case_id)?;
    let base = repo_root.join("eval").join("results");
    let run_dir = match run_id {
        Some(run_id) => {
            validate_slug("run id", run_id)?;
            let dir = results_dir(&base, case_id, run_id);
            if !dir.exists() {
                bail!("run {} not found at {}", run_id, dir.display());
            }
            dir
        }
        None => latest_run_dir(&case_results_dir(repo_root, case_id))?,
    };
    let (meta, metrics) = load_metrics(&run_dir)?;
    if format == ReportFormat::Table {
        println!(
            "report: case={} run_id={} grader={} runs={}",
            meta.case_id, meta.run_id, meta.grader, meta.runs
        );
    }
    print!("{}", render(&metrics, format)?);
    if format == ReportFormat::Json {
        println!();
    }
    Ok(())
}

/// Remove results for a case.
pub fn clean_case(repo_root: &Path, case_id: &str) -> Result<()> {
    validate_slug("case id", case_id)?;
    let case_results = case_results_dir(repo_root, case_id);
    if case_results.exists() {
        std::fs::remove_dir_all(&case_results)
            .with_context(|| format!("remove {}", case_results.display()))?;
    }
    println!("clean: case={} results={}", case_id, case_results.display());
    Ok(())
}
