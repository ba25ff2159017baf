//! Multi-run aggregation.
//!
//! Combines repeated-trial outcomes per item into accuracy, consistency and
//! per-category pass rates. Every function here is total: empty inputs yield
//! defined values (0.0 for empty populations) instead of errors.
//!
//! Two empty-sequence rules coexist on purpose and must not be unified:
//! an empty trial sequence is *consistent* (vacuous agreement) but is *not* a
//! majority pass.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::core::capability::{estimate_pass_at_k, pass_at_k, pass_caret_k};

/// Repeated verdicts for one logical test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestResult {
    pub test_id: String,
    pub name: String,
    pub expected: String,
    pub runs: Vec<String>,
}

/// Repeated pass/fail outcomes for one case within a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvalResult {
    pub case_id: String,
    pub category: String,
    pub runs: Vec<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryMetrics {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub pass_rate: f64,
}

/// Population-level pass@k / pass^k rollup over eval items.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityMetrics {
    /// Largest trial count seen across items.
    pub k: usize,
    /// Fraction of items with at least one passing trial.
    pub pass_at_k: f64,
    /// Fraction of items whose trials all passed.
    pub pass_caret_k: f64,
    /// Mean per-item pass@1 estimate.
    pub estimated_pass_at_1: f64,
}

/// Summary derived from one aggregation pass. Both renderings read from it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedMetrics {
    pub total_items: usize,
    pub accuracy: f64,
    pub consistency: f64,
    pub pass_rate: f64,
    pub by_category: BTreeMap<String, CategoryMetrics>,
    pub capability: CapabilityMetrics,
}

/// Most frequent verdict; ties resolve to the lexicographically smallest.
///
/// Returns `None` for an empty sequence.
pub fn majority_verdict<S: AsRef<str>>(runs: &[S]) -> Option<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for run in runs {
        *counts.entry(run.as_ref()).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|(left_verdict, left_count), (right_verdict, right_count)| {
            left_count
                .cmp(right_count)
                .then_with(|| right_verdict.cmp(left_verdict))
        })
        .map(|(verdict, _)| verdict.to_string())
}

/// Strict majority: more than half the runs passed. Ties and empty input fail.
pub fn is_majority_pass(runs: &[bool]) -> bool {
    let passes = runs.iter().filter(|passed| **passed).count();
    !runs.is_empty() && passes * 2 > runs.len()
}

/// All runs identical. Empty and single-run sequences are consistent.
pub fn is_consistent<T: PartialEq>(runs: &[T]) -> bool {
    runs.windows(2).all(|pair| pair[0] == pair[1])
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        return 0.0;
    }
    numerator as f64 / denominator as f64
}

/// Fraction of tests whose majority verdict equals the expected verdict.
pub fn accuracy(tests: &[TestResult]) -> f64 {
    let correct = tests
        .iter()
        .filter(|test| majority_verdict(&test.runs).as_deref() == Some(test.expected.as_str()))
        .count();
    ratio(correct, tests.len())
}

/// Fraction of tests whose runs all agree.
pub fn consistency(tests: &[TestResult]) -> f64 {
    let consistent = tests.iter().filter(|test| is_consistent(&test.runs)).count();
    ratio(consistent, tests.len())
}

/// Group eval items by category using the majority-pass rule.
pub fn category_rollup(evals: &[EvalResult]) -> BTreeMap<String, CategoryMetrics> {
    let mut by_category: BTreeMap<String, CategoryMetrics> = BTreeMap::new();
    for eval in evals {
        let metrics = by_category.entry(eval.category.clone()).or_default();
        metrics.total += 1;
        if is_majority_pass(&eval.runs) {
            metrics.pass += 1;
        } else {
            metrics.fail += 1;
        }
    }
    for metrics in by_category.values_mut() {
        metrics.pass_rate = ratio(metrics.pass, metrics.total);
    }
    by_category
}

pub fn capability(evals: &[EvalResult]) -> CapabilityMetrics {
    let k = evals.iter().map(|eval| eval.runs.len()).max().unwrap_or(0);
    let any_pass = evals.iter().filter(|eval| pass_at_k(&eval.runs)).count();
    let all_pass = evals.iter().filter(|eval| pass_caret_k(&eval.runs)).count();
    let estimated_pass_at_1 = if evals.is_empty() {
        0.0
    } else {
        evals
            .iter()
            .map(|eval| estimate_pass_at_k(&eval.runs, 1))
            .sum::<f64>()
            / evals.len() as f64
    };
    CapabilityMetrics {
        k,
        pass_at_k: ratio(any_pass, evals.len()),
        pass_caret_k: ratio(all_pass, evals.len()),
        estimated_pass_at_1,
    }
}

/// Aggregate verdict trials and pass/fail trials.
///
/// `tests` drive accuracy and consistency; `evals` drive the pass rate, the
/// category rollup and capability. When both describe the same items (the
/// usual case) `total_items` is their shared length; otherwise the larger.
pub fn aggregate(tests: &[TestResult], evals: &[EvalResult]) -> AggregatedMetrics {
    let by_category = category_rollup(evals);
    let passed: usize = by_category.values().map(|metrics| metrics.pass).sum();
    AggregatedMetrics {
        total_items: tests.len().max(evals.len()),
        accuracy: accuracy(tests),
        consistency: consistency(tests),
        pass_rate: ratio(passed, evals.len()),
        by_category,
        capability: capability(evals),
    }
}

impl AggregatedMetrics {
    /// Render the machine-readable summary.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Render a fixed-width table, categories in lexicographic order.
    pub fn render_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "items:        {}", self.total_items);
        let _ = writeln!(out, "accuracy:     {:.1}%", self.accuracy * 100.0);
        let _ = writeln!(out, "consistency:  {:.1}%", self.consistency * 100.0);
        let _ = writeln!(out, "pass rate:    {:.1}%", self.pass_rate * 100.0);
        let _ = writeln!(
            out,
            "pass@{k}:       {:.1}%   pass^{k}: {:.1}%   est. pass@1: {:.1}%",
            self.capability.pass_at_k * 100.0,
            self.capability.pass_caret_k * 100.0,
            self.capability.estimated_pass_at_1 * 100.0,
            k = self.capability.k,
        );
        if self.by_category.is_empty() {
            return out;
        }
        let width = self
            .by_category
            .keys()
            .map(|name| name.chars().count())
            .max()
            .unwrap_or(0)
            .max("CATEGORY".len());
        out.push('\n');
        let _ = writeln!(
            out,
            "{:<width$}  {:>5}  {:>5}  {:>5}  {:>9}",
            "CATEGORY", "TOTAL", "PASS", "FAIL", "PASS RATE"
        );
        for (name, metrics) in &self.by_category {
            let _ = writeln!(
                out,
                "{:<width$}  {:>5}  {:>5}  {:>5}  {:>8.1}%",
                name,
                metrics.total,
                metrics.pass,
                metrics.fail,
                metrics.pass_rate * 100.0
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_result(id: &str, expected: &str, runs: &[&str]) -> TestResult {
        TestResult {
            test_id: id.to_string(),
            name: format!("{id} name"),
            expected: expected.to_string(),
            runs: runs.iter().map(|run| run.to_string()).collect(),
        }
    }

    fn eval(id: &str, category: &str, runs: &[bool]) -> EvalResult {
        EvalResult {
            case_id: id.to_string(),
            category: category.to_string(),
            runs: runs.to_vec(),
        }
    }

    #[test]
    fn majority_picks_most_frequent() {
        assert_eq!(
            majority_verdict(&["PASS", "PASS", "FAIL"]).as_deref(),
            Some("PASS")
        );
    }

    #[test]
    fn majority_tie_breaks_lexicographically() {
        assert_eq!(majority_verdict(&["PASS", "FAIL"]).as_deref(), Some("FAIL"));
        assert_eq!(majority_verdict(&["FAIL", "PASS"]).as_deref(), Some("FAIL"));
        assert_eq!(
            majority_verdict(&["SKIP", "PASS", "ERROR", "SKIP", "PASS", "ERROR"]).as_deref(),
            Some("ERROR")
        );
    }

    #[test]
    fn majority_of_empty_is_none() {
        let runs: [&str; 0] = [];
        assert_eq!(majority_verdict(&runs), None);
    }

    #[test]
    fn majority_pass_is_strict() {
        assert!(is_majority_pass(&[true, true, false]));
        assert!(!is_majority_pass(&[true, false]));
        assert!(!is_majority_pass(&[]));
        assert!(is_majority_pass(&[true]));
    }

    #[test]
    fn consistency_treats_empty_as_consistent() {
        assert!(is_consistent::<bool>(&[]));
        assert!(is_consistent(&["PASS"]));
        assert!(is_consistent(&["PASS", "PASS"]));
        assert!(!is_consistent(&["PASS", "FAIL"]));
    }

    #[test]
    fn accuracy_and_consistency_over_tests() {
        let tests = vec![
            test_result("a", "PASS", &["PASS", "PASS", "PASS"]),
            test_result("b", "PASS", &["PASS", "FAIL"]),
            test_result("c", "FAIL", &["FAIL", "FAIL", "PASS"]),
            test_result("d", "PASS", &[]),
        ];
        // a and c correct; b ties to FAIL; d has no majority
        assert_eq!(accuracy(&tests), 0.5);
        // a and d consistent
        assert_eq!(consistency(&tests), 0.5);
    }

    #[test]
    fn single_category_rollup() {
        let metrics = aggregate(&[], &[eval("case-1", "X", &[true, true, false])]);
        assert_eq!(
            metrics.by_category["X"],
            CategoryMetrics {
                total: 1,
                pass: 1,
                fail: 0,
                pass_rate: 1.0,
            }
        );
        assert_eq!(metrics.total_items, 1);
        assert_eq!(metrics.pass_rate, 1.0);
    }

    #[test]
    fn empty_population_is_zero() {
        let metrics = aggregate(&[], &[]);
        assert_eq!(metrics, AggregatedMetrics::default());
    }

    #[test]
    fn capability_rollup() {
        let evals = vec![
            eval("a", "x", &[true, true]),
            eval("b", "x", &[false, true]),
            eval("c", "y", &[false, false]),
            eval("d", "y", &[]),
        ];
        let metrics = capability(&evals);
        assert_eq!(metrics.k, 2);
        assert_eq!(metrics.pass_at_k, 0.5);
        assert_eq!(metrics.pass_caret_k, 0.25);
        // (1.0 + 0.5 + 0 + 0) / 4
        assert!((metrics.estimated_pass_at_1 - 0.375).abs() < 1e-9);
    }

    #[test]
    fn table_is_sorted_by_category() {
        let evals = vec![
            eval("1", "zeta", &[true]),
            eval("2", "alpha", &[false]),
            eval("3", "mid", &[true, false]),
        ];
        let table = aggregate(&[], &evals).render_table();
        let alpha = table.find("alpha").expect("alpha");
        let mid = table.find("mid").expect("mid");
        let zeta = table.find("zeta").expect("zeta");
        assert!(alpha < mid && mid < zeta);
        assert!(table.contains("CATEGORY"));
    }

    #[test]
    fn json_uses_stable_field_names() {
        let metrics = aggregate(
            &[test_result("a", "PASS", &["PASS"])],
            &[eval("a", "X", &[true])],
        );
        let value: serde_json::Value =
            serde_json::from_str(&metrics.to_json().expect("json")).expect("parse");
        for field in [
            "total_items",
            "accuracy",
            "consistency",
            "pass_rate",
            "by_category",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["by_category"]["X"]["pass_rate"], 1.0);
    }

    #[test]
    fn table_and_json_agree() {
        let evals = vec![eval("a", "X", &[true, false, true]), eval("b", "X", &[false])];
        let metrics = aggregate(&[], &evals);
        let table = metrics.render_table();
        let round_trip: AggregatedMetrics =
            serde_json::from_str(&metrics.to_json().expect("json")).expect("parse");
        assert_eq!(round_trip.by_category, metrics.by_category);
        assert_eq!(round_trip.pass_rate, 0.5);
        assert!(table.contains("50.0%"));
    }
}
