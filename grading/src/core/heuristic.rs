//! Deterministic text heuristics for specification quality.
//!
//! Each criterion maps a fixed combination of textual signals to a hardcoded
//! score band. Bands are evaluated top to bottom and the first match wins.
//! Every band lies in `[0, 100]`, so results are in range by construction.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::criteria::CriterionName;
use crate::core::types::Criterion;

const VAGUE_MARKERS: [&str; 5] = ["investigate", "explore", "look into", "figure out", "tbd"];
const REQUIREMENT_MARKERS: [&str; 2] = ["should", "must"];
const SPRAWL_MARKERS: [&str; 2] = ["and also", "etc"];

static LIST_ITEM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(?:[-*+]|\d+[.)])\s+\S").expect("list item regex"));

/// Textual signals extracted once per input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signals {
    pub chars: usize,
    pub list_items: usize,
    pub vague: bool,
    pub has_acceptance_criteria: bool,
    pub has_requirement_words: bool,
    pub sprawling: bool,
}

impl Signals {
    pub fn extract(content: &str) -> Self {
        let trimmed = content.trim();
        let lower = trimmed.to_lowercase();
        Self {
            chars: trimmed.chars().count(),
            list_items: count_list_items(trimmed),
            vague: contains_any(&lower, &VAGUE_MARKERS),
            has_acceptance_criteria: lower.contains("acceptance criteria"),
            has_requirement_words: contains_any(&lower, &REQUIREMENT_MARKERS),
            sprawling: contains_any(&lower, &SPRAWL_MARKERS),
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Count enumerated list lines (`- x`, `* x`, `1. x`, `2) x`).
pub fn count_list_items(content: &str) -> usize {
    content
        .lines()
        .filter(|line| LIST_ITEM_RE.is_match(line))
        .count()
}

pub fn clarity(signals: &Signals) -> Criterion {
    let (score, feedback) = if signals.chars == 0 {
        (0.0, "specification is empty")
    } else if signals.vague {
        (40.0, "uses exploratory language instead of concrete outcomes")
    } else if signals.chars < 50 {
        (55.0, "too short to state the outcome unambiguously")
    } else {
        (85.0, "states concrete outcomes")
    };
    criterion(score, feedback)
}

pub fn completeness(signals: &Signals) -> Criterion {
    let (score, feedback) = if signals.chars >= 500 {
        (85.0, "detailed description")
    } else if signals.chars >= 200 {
        (70.0, "reasonably detailed")
    } else if signals.chars >= 50 {
        (50.0, "missing supporting detail")
    } else {
        (20.0, "little more than a title")
    };
    criterion(score, feedback)
}

pub fn testability(signals: &Signals) -> Criterion {
    let (score, feedback) = if signals.has_acceptance_criteria && signals.list_items >= 3 {
        (90.0, "enumerated acceptance criteria")
    } else if signals.list_items >= 1 {
        (70.0, "lists checkable items")
    } else if signals.has_requirement_words {
        (55.0, "states requirements without enumerated checks")
    } else {
        (30.0, "no verifiable criteria")
    };
    criterion(score, feedback)
}

pub fn scope(signals: &Signals) -> Criterion {
    let (score, feedback) = if signals.list_items > 10 {
        (45.0, "too many items for a single task")
    } else if signals.sprawling {
        (60.0, "open-ended scope")
    } else {
        (80.0, "focused scope")
    };
    criterion(score, feedback)
}

fn criterion(score: f64, feedback: &str) -> Criterion {
    Criterion {
        score,
        feedback: feedback.to_string(),
    }
}

/// Score every criterion for the given content.
pub fn score_criteria(content: &str) -> BTreeMap<CriterionName, Criterion> {
    let signals = Signals::extract(content);
    let mut criteria = BTreeMap::new();
    criteria.insert(CriterionName::Clarity, clarity(&signals));
    criteria.insert(CriterionName::Completeness, completeness(&signals));
    criteria.insert(CriterionName::Testability, testability(&signals));
    criteria.insert(CriterionName::Scope, scope(&signals));
    criteria
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scores(content: &str) -> [f64; 4] {
        let criteria = score_criteria(content);
        CriterionName::ALL.map(|name| criteria[&name].score)
    }

    #[test]
    fn counts_list_items() {
        let text = "intro\n- one\n* two\n+ three\n1. four\n2) five\n-not a list\n10.also not";
        assert_eq!(count_list_items(text), 5);
    }

    #[test]
    fn vague_short_spec_bands() {
        // clarity: vague marker beats the length band
        assert_eq!(scores("Investigate flaky login"), [40.0, 20.0, 30.0, 80.0]);
    }

    #[test]
    fn short_concrete_spec_bands() {
        assert_eq!(scores("Add a --json flag"), [55.0, 20.0, 30.0, 80.0]);
    }

    #[test]
    fn requirement_words_without_list() {
        let text = "The export command must write valid CSV with a header row for every table.";
        assert_eq!(scores(text), [85.0, 50.0, 55.0, 80.0]);
    }

    #[test]
    fn acceptance_criteria_with_list() {
        let text = "\
Add retry support to the HTTP client used by the sync job.

Acceptance criteria:
- retries idempotent requests up to 3 times
- backs off exponentially starting at 100ms
- surfaces the last error after the final attempt
";
        assert!(text.trim().chars().count() >= 200);
        assert_eq!(scores(text), [85.0, 70.0, 90.0, 80.0]);
    }

    #[test]
    fn sprawling_and_long_lists() {
        let mut text = String::from("Refactor the storage layer and clean up the config loader.\n");
        for idx in 0..11 {
            text.push_str(&format!("- item {idx}\n"));
        }
        let criteria = score_criteria(&text);
        assert_eq!(criteria[&CriterionName::Scope].score, 45.0);

        let criteria = score_criteria("Update docs, fix tests, etc. Keep the release notes current.");
        assert_eq!(criteria[&CriterionName::Scope].score, 60.0);
    }

    #[test]
    fn long_spec_reaches_top_completeness_band() {
        let text = "x".repeat(500);
        let criteria = score_criteria(&text);
        assert_eq!(criteria[&CriterionName::Completeness].score, 85.0);
    }

    #[test]
    fn empty_content_scores_zero_clarity() {
        let criteria = score_criteria("   ");
        assert_eq!(criteria[&CriterionName::Clarity].score, 0.0);
    }
}
