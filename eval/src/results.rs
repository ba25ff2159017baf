//! Result persistence.
//!
//! Each run writes `trials.json` (every trial of every item) and `meta.json`
//! under `eval/results/<case>/<run-id>/`. Run ids sort chronologically.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Utc};
use grading::core::types::Verdict;
use rand::{Rng, distributions::Alphanumeric};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use crate::outcome::TrialRecord;

/// All trials of one case item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItemTrials {
    pub item_id: String,
    pub name: String,
    pub category: String,
    pub expected: Verdict,
    pub trials: Vec<TrialRecord>,
}

/// Metadata for an eval run, persisted to `meta.json`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMeta {
    pub case_id: String,
    pub run_id: String,
    pub grader: String,
    /// SHA-256 of the case file for reproducibility tracking.
    pub case_hash: String,
    pub runs: u32,
    pub items: usize,
    pub start_time: String,
    pub end_time: String,
    pub duration_secs: f64,
}

impl RunMeta {
    pub fn timing(&mut self, started_at: DateTime<Utc>, finished_at: DateTime<Utc>) {
        self.start_time = started_at.to_rfc3339();
        self.end_time = finished_at.to_rfc3339();
        self.duration_secs = (finished_at - started_at).num_milliseconds() as f64 / 1000.0;
    }
}

/// `eval-<utc timestamp>-<random suffix>`.
pub fn new_run_id(now: DateTime<Utc>) -> String {
    format!("eval-{}-{}", now.format("%Y%m%d_%H%M%S"), short_id())
}

fn short_id() -> String {
    let mut rng = rand::thread_rng();
    std::iter::repeat_with(|| rng.sample(Alphanumeric))
        .map(char::from)
        .take(6)
        .collect::<String>()
        .to_lowercase()
}

pub fn results_dir(base_dir: &Path, case_id: &str, run_id: &str) -> PathBuf {
    base_dir.join(case_id).join(run_id)
}

/// Write `trials.json` and `meta.json` into a fresh run directory.
#[instrument(skip_all, fields(case_id = %meta.case_id, run_id = %meta.run_id))]
pub fn write_run(base_dir: &Path, meta: &RunMeta, items: &[ItemTrials]) -> Result<PathBuf> {
    let dir = results_dir(base_dir, &meta.case_id, &meta.run_id);
    fs::create_dir_all(&dir).with_context(|| format!("create results dir {}", dir.display()))?;
    write_json(&dir.join("trials.json"), items)?;
    write_json(&dir.join("meta.json"), meta)?;
    debug!(results_dir = %dir.display(), "run written");
    Ok(dir)
}

/// Load a run written by [`write_run`].
pub fn load_run(dir: &Path) -> Result<(RunMeta, Vec<ItemTrials>)> {
    let meta: RunMeta = read_json(&dir.join("meta.json"))?;
    let items: Vec<ItemTrials> = read_json(&dir.join("trials.json"))?;
    Ok((meta, items))
}

/// Run directories of a case, oldest first.
pub fn list_run_dirs(case_results_dir: &Path) -> Result<Vec<PathBuf>> {
    if !case_results_dir.exists() {
        return Ok(Vec::new());
    }
    let mut dirs = Vec::new();
    for entry in fs::read_dir(case_results_dir)
        .with_context(|| format!("read {}", case_results_dir.display()))?
    {
        let entry = entry.context("read entry")?;
        if entry.path().is_dir() {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

pub fn latest_run_dir(case_results_dir: &Path) -> Result<PathBuf> {
    list_run_dirs(case_results_dir)?
        .pop()
        .ok_or_else(|| anyhow!("no runs under {}", case_results_dir.display()))
}

pub fn file_sha256(path: &Path) -> Result<String> {
    let contents = fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let mut hasher = Sha256::new();
    hasher.update(contents);
    Ok(hex::encode(hasher.finalize()))
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let contents = serde_json::to_string_pretty(value)
        .with_context(|| format!("serialize {}", path.display()))?;
    fs::write(path, format!("{contents}\n")).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse {}", path.display()))
}
