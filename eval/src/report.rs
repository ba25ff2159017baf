//! Aggregation of persisted trials into reliability metrics.

use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use grading::core::aggregate::{AggregatedMetrics, EvalResult, TestResult, aggregate};

use crate::results::{ItemTrials, RunMeta, load_run};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    #[default]
    Table,
    Json,
}

/// Verdict sequences for accuracy/consistency, and expected-match booleans
/// for the category and capability rollups.
pub fn aggregation_inputs(items: &[ItemTrials]) -> (Vec<TestResult>, Vec<EvalResult>) {
    let tests = items
        .iter()
        .map(|item| TestResult {
            test_id: item.item_id.clone(),
            name: item.name.clone(),
            expected: item.expected.as_str().to_string(),
            runs: item
                .trials
                .iter()
                .map(|trial| trial.verdict.as_str().to_string())
                .collect(),
        })
        .collect();
    let evals = items
        .iter()
        .map(|item| EvalResult {
            case_id: item.item_id.clone(),
            category: item.category.clone(),
            runs: item
                .trials
                .iter()
                .map(|trial| trial.verdict.matches(item.expected))
                .collect(),
        })
        .collect();
    (tests, evals)
}

pub fn metrics_for(items: &[ItemTrials]) -> AggregatedMetrics {
    let (tests, evals) = aggregation_inputs(items);
    aggregate(&tests, &evals)
}

/// Load a run directory and aggregate it.
pub fn load_metrics(run_dir: &Path) -> Result<(RunMeta, AggregatedMetrics)> {
    let (meta, items) =
        load_run(run_dir).with_context(|| format!("load run {}", run_dir.display()))?;
    Ok((meta, metrics_for(&items)))
}

pub fn render(metrics: &AggregatedMetrics, format: ReportFormat) -> Result<String> {
    match format {
        ReportFormat::Table => Ok(metrics.render_table()),
        ReportFormat::Json => metrics.to_json().context("serialize metrics"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{TrialRecord, TrialVerdict};
    use grading::core::types::{GradeResult, Verdict};

    fn item(id: &str, category: &str, expected: Verdict, verdicts: &[TrialVerdict]) -> ItemTrials {
        ItemTrials {
            item_id: id.to_string(),
            name: id.to_string(),
            category: category.to_string(),
            expected,
            trials: verdicts
                .iter()
                .enumerate()
                .map(|(index, verdict)| TrialRecord {
                    trial: index as u32 + 1,
                    verdict: *verdict,
                    result: GradeResult::default(),
                    skip_reason: None,
                    error: None,
                    duration_ms: 0,
                })
                .collect(),
        }
    }

    #[test]
    fn maps_trials_to_aggregation_inputs() {
        use TrialVerdict::{Error, Fail, Pass};
        let items = vec![item("a", "x", Verdict::Pass, &[Pass, Pass, Error])];
        let (tests, evals) = aggregation_inputs(&items);
        assert_eq!(tests[0].expected, "PASS");
        assert_eq!(tests[0].runs, vec!["PASS", "PASS", "ERROR"]);
        assert_eq!(evals[0].runs, vec![true, true, false]);

        let items = vec![item("b", "x", Verdict::Fail, &[Fail, Pass])];
        let (_, evals) = aggregation_inputs(&items);
        assert_eq!(evals[0].runs, vec![true, false]);
    }

    #[test]
    fn aggregates_accuracy_consistency_and_categories() {
        use TrialVerdict::{Fail, Pass, Skip};
        let items = vec![
            item("a", "specs", Verdict::Pass, &[Pass, Pass, Fail]),
            item("b", "specs", Verdict::Fail, &[Fail, Fail, Fail]),
            item("c", "review", Verdict::Pass, &[Skip, Skip, Skip]),
        ];
        let metrics = metrics_for(&items);
        assert_eq!(metrics.total_items, 3);
        assert!((metrics.accuracy - 2.0 / 3.0).abs() < 1e-9);
        assert!((metrics.consistency - 2.0 / 3.0).abs() < 1e-9);
        let specs = &metrics.by_category["specs"];
        assert_eq!((specs.total, specs.pass, specs.fail), (2, 2, 0));
        assert_eq!(metrics.by_category["review"].pass_rate, 0.0);
        assert_eq!(metrics.capability.k, 3);
    }

    #[test]
    fn renders_both_formats_from_same_metrics() {
        let items = vec![item("a", "specs", Verdict::Pass, &[TrialVerdict::Pass])];
        let metrics = metrics_for(&items);
        let table = render(&metrics, ReportFormat::Table).expect("table");
        assert!(table.contains("specs"));
        let json = render(&metrics, ReportFormat::Json).expect("json");
        let value: serde_json::Value = serde_json::from_str(&json).expect("parse");
        assert_eq!(value["total_items"], 1);
        assert_eq!(value["by_category"]["specs"]["pass"], 1);
    }
}
