//! Coverage comparison and coverage-tool output parsing.

use std::sync::LazyLock;

use regex::Regex;

static PERCENT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("percent regex"));

const NO_TEST_FILES: &str = "no test files";

/// What the coverage tool reported for the changed files.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CoverageReport {
    Percent(f64),
    NoTestFiles,
}

/// Threshold-inclusive comparison: `actual >= threshold` passes.
pub fn evaluate_coverage(actual: f64, threshold: f64) -> bool {
    actual >= threshold
}

/// Parse tool output. The last percentage wins since tools print the total last.
/// `no test files` is reported only when no percentage is present, so
/// multi-package output with some untested packages still yields a number.
pub fn parse_coverage_output(output: &str) -> Option<CoverageReport> {
    let percent = PERCENT_RE
        .captures_iter(output)
        .filter_map(|caps| caps.get(1)?.as_str().parse::<f64>().ok())
        .last();
    match percent {
        Some(percent) => Some(CoverageReport::Percent(percent)),
        None if output.to_lowercase().contains(NO_TEST_FILES) => {
            Some(CoverageReport::NoTestFiles)
        }
        None => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn threshold_is_inclusive() {
        assert!(evaluate_coverage(80.0, 80.0));
        assert!(evaluate_coverage(80.1, 80.0));
        assert!(!evaluate_coverage(79.9, 80.0));
    }

    #[test]
    fn parses_last_percentage() {
        let output = "pkg/a 50.0%\npkg/b 75.5%\ntotal: (statements) 68.25%\n";
        assert_eq!(
            parse_coverage_output(output),
            Some(CoverageReport::Percent(68.25))
        );
    }

    #[test]
    fn detects_no_test_files() {
        let output = "?   \texample.com/pkg\t[no test files]\n";
        assert_eq!(
            parse_coverage_output(output),
            Some(CoverageReport::NoTestFiles)
        );
    }

    #[test]
    fn percentage_wins_over_untested_packages() {
        let output = "?   \tpkg/cmd\t[no test files]\nok  \tpkg/core\t0.01s\tcoverage: 92.0% of statements\n";
        assert_eq!(
            parse_coverage_output(output),
            Some(CoverageReport::Percent(92.0))
        );
    }

    #[test]
    fn unparseable_output_is_none() {
        assert_eq!(parse_coverage_output("ok"), None);
    }
}
