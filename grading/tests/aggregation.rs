//! Aggregation and capability properties over repeated trials.

use grading::core::aggregate::{
    EvalResult, TestResult, aggregate, is_majority_pass, majority_verdict,
};
use grading::core::capability::{pass_at_k, pass_at_k_probability, pass_caret_k};

fn eval(case_id: &str, category: &str, runs: &[bool]) -> EvalResult {
    EvalResult {
        case_id: case_id.to_string(),
        category: category.to_string(),
        runs: runs.to_vec(),
    }
}

fn test(id: &str, expected: &str, runs: &[&str]) -> TestResult {
    TestResult {
        test_id: id.to_string(),
        name: id.to_string(),
        expected: expected.to_string(),
        runs: runs.iter().map(|run| run.to_string()).collect(),
    }
}

#[test]
fn majority_and_capability_fixtures() {
    assert_eq!(majority_verdict(&["PASS", "FAIL"]).as_deref(), Some("FAIL"));
    assert_eq!(
        majority_verdict(&["PASS", "PASS", "FAIL"]).as_deref(),
        Some("PASS")
    );
    assert!(is_majority_pass(&[true, true, false]));
    assert!(!is_majority_pass(&[true, false]));
    assert!(!is_majority_pass(&[]));
    assert!(!pass_at_k(&[false, false]));
    assert!(pass_at_k(&[false, true]));
    assert!(pass_caret_k(&[true, true]));
    assert!(!pass_caret_k(&[]));
    assert_eq!(pass_at_k_probability(10, 0, 3), 0.0);
    assert_eq!(pass_at_k_probability(5, 5, 3), 1.0);
    assert_eq!(pass_at_k_probability(0, 0, 1), 0.0);
}

#[test]
fn single_category_majority_pass() {
    let metrics = aggregate(&[], &[eval("a", "X", &[true, true, false])]);
    let x = &metrics.by_category["X"];
    assert_eq!((x.total, x.pass, x.fail), (1, 1, 0));
    assert_eq!(x.pass_rate, 1.0);
}

#[test]
fn tie_break_is_independent_of_order() {
    let forward = test("t", "FAIL", &["PASS", "FAIL", "SKIP", "SKIP", "PASS", "FAIL"]);
    let mut reversed = forward.clone();
    reversed.runs.reverse();
    assert_eq!(
        majority_verdict(&forward.runs),
        majority_verdict(&reversed.runs)
    );
    assert_eq!(majority_verdict(&forward.runs).as_deref(), Some("FAIL"));
    let metrics = aggregate(&[forward, reversed], &[]);
    assert_eq!(metrics.accuracy, 1.0);
}

#[test]
fn empty_runs_are_consistent_but_not_passing() {
    let metrics = aggregate(&[test("t", "PASS", &[])], &[eval("e", "X", &[])]);
    assert_eq!(metrics.consistency, 1.0);
    assert_eq!(metrics.accuracy, 0.0);
    assert_eq!(metrics.by_category["X"].fail, 1);
    assert_eq!(metrics.capability.pass_caret_k, 0.0);
}

#[test]
fn renderings_agree() {
    let metrics = aggregate(
        &[test("a", "PASS", &["PASS", "PASS"])],
        &[eval("a", "beta", &[true, true]), eval("b", "alpha", &[false])],
    );
    let table = metrics.render_table();
    let alpha = table.find("alpha").expect("alpha row");
    let beta = table.find("beta").expect("beta row");
    assert!(alpha < beta);

    let json: serde_json::Value =
        serde_json::from_str(&metrics.to_json().expect("json")).expect("parse");
    for field in ["total_items", "accuracy", "consistency", "pass_rate", "by_category"] {
        assert!(json.get(field).is_some(), "missing {field}");
    }
    assert_eq!(json["by_category"]["alpha"]["fail"], 1);
    assert!(table.contains("pass rate:    50.0%"));
}

#[test]
fn empty_population_yields_zeroes() {
    let metrics = aggregate(&[], &[]);
    assert_eq!(metrics.total_items, 0);
    assert_eq!(metrics.accuracy, 0.0);
    assert_eq!(metrics.consistency, 0.0);
    assert_eq!(metrics.pass_rate, 0.0);
    assert!(metrics.by_category.is_empty());
}
