//! Judge response parsing.
//!
//! Judges answer in a line-oriented `KEY: value` format. The text is first
//! tokenized into `(key, value)` fields, then validated against a typed schema
//! table. Keys are uppercase literals matched case-sensitively, and only keys
//! the schema names start a field. When a key appears more than once the first
//! non-empty occurrence is used and later ones are ignored. Any other line
//! continues the value of the preceding field, so multi-line reasoning
//! (including lines like `NOTE: ...`) is kept intact.

use std::collections::BTreeMap;

use serde_json::json;
use thiserror::Error;

use crate::core::criteria::{CriterionName, GraderWeights};
use crate::core::types::{Criterion, GradeResult, Verdict};

/// Reasons a judge response is rejected. No partial result is produced.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("judge response is empty")]
    EmptyResponse,
    #[error("judge response missing required field {field}")]
    MissingField { field: &'static str },
    #[error("invalid verdict {value:?}: expected PASS or FAIL")]
    InvalidVerdict { value: String },
    #[error("{field} is not numeric: {value:?}")]
    ScoreNotNumeric { field: &'static str, value: String },
    #[error("{field} out of range [0, 100]: {value}")]
    ScoreOutOfRange { field: &'static str, value: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Verdict,
    Score,
    Text,
}

#[derive(Debug, Clone, Copy)]
struct FieldSpec {
    key: &'static str,
    required: bool,
    kind: FieldKind,
}

const VERDICT_SCHEMA: [FieldSpec; 3] = [
    FieldSpec {
        key: "VERDICT",
        required: true,
        kind: FieldKind::Verdict,
    },
    FieldSpec {
        key: "SCORE",
        required: true,
        kind: FieldKind::Score,
    },
    FieldSpec {
        key: "REASONING",
        required: true,
        kind: FieldKind::Text,
    },
];

fn criteria_schema() -> Vec<FieldSpec> {
    let mut schema = Vec::with_capacity(CriterionName::ALL.len() * 2 + 1);
    for name in CriterionName::ALL {
        schema.push(FieldSpec {
            key: name.score_key(),
            required: true,
            kind: FieldKind::Score,
        });
        schema.push(FieldSpec {
            key: name.feedback_key(),
            required: true,
            kind: FieldKind::Text,
        });
    }
    schema.push(FieldSpec {
        key: "SUMMARY",
        required: false,
        kind: FieldKind::Text,
    });
    schema
}

/// A raw `KEY: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    pub key: String,
    pub value: String,
}

/// Split judge output into fields on lines that start with one of `keys`.
/// Whitespace around keys and values is stripped.
pub fn tokenize(text: &str, keys: &[&str]) -> Vec<Field> {
    let mut fields: Vec<Field> = Vec::new();
    for line in text.lines() {
        if let Some((key, value)) = split_key_line(line, keys) {
            fields.push(Field {
                key: key.to_string(),
                value: value.to_string(),
            });
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(last) = fields.last_mut() {
            if !last.value.is_empty() {
                last.value.push('\n');
            }
            last.value.push_str(trimmed);
        }
    }
    fields
}

fn split_key_line<'a>(line: &'a str, keys: &[&str]) -> Option<(&'a str, &'a str)> {
    let (key, value) = line.split_once(':')?;
    let key = key.trim();
    keys.contains(&key).then(|| (key, value.trim()))
}

/// Validated values keyed by schema key.
#[derive(Debug, Default)]
struct Validated {
    verdicts: BTreeMap<&'static str, Verdict>,
    scores: BTreeMap<&'static str, f64>,
    texts: BTreeMap<&'static str, String>,
}

fn validate(text: &str, schema: &[FieldSpec]) -> Result<Validated, ParseError> {
    if text.trim().is_empty() {
        return Err(ParseError::EmptyResponse);
    }
    let keys: Vec<&str> = schema.iter().map(|spec| spec.key).collect();
    let fields = tokenize(text, &keys);
    let mut validated = Validated::default();

    for spec in schema {
        let value = fields
            .iter()
            .filter(|field| field.key == spec.key)
            .map(|field| field.value.as_str())
            .find(|value| !value.is_empty());
        let Some(value) = value else {
            if spec.required {
                return Err(ParseError::MissingField { field: spec.key });
            }
            continue;
        };

        match spec.kind {
            FieldKind::Verdict => {
                let verdict = value
                    .parse::<Verdict>()
                    .map_err(|()| ParseError::InvalidVerdict {
                        value: value.to_string(),
                    })?;
                validated.verdicts.insert(spec.key, verdict);
            }
            FieldKind::Score => {
                validated.scores.insert(spec.key, parse_score(spec.key, value)?);
            }
            FieldKind::Text => {
                validated.texts.insert(spec.key, value.to_string());
            }
        }
    }
    Ok(validated)
}

/// Parse a score in the closed interval `[0, 100]`. Never clamps.
pub fn parse_score(field: &'static str, value: &str) -> Result<f64, ParseError> {
    let score = value
        .parse::<f64>()
        .ok()
        .filter(|score| score.is_finite())
        .ok_or_else(|| ParseError::ScoreNotNumeric {
            field,
            value: value.to_string(),
        })?;
    if !(0.0..=100.0).contains(&score) {
        return Err(ParseError::ScoreOutOfRange {
            field,
            value: score,
        });
    }
    Ok(score)
}

/// Parsed binary-verdict response.
#[derive(Debug, Clone, PartialEq)]
pub struct VerdictResponse {
    pub verdict: Verdict,
    pub score: f64,
    pub reasoning: String,
}

impl VerdictResponse {
    pub fn into_result(self) -> GradeResult {
        let mut details = BTreeMap::new();
        details.insert("verdict".to_string(), json!(self.verdict.as_str()));
        GradeResult {
            passed: self.verdict.is_pass(),
            score: self.score,
            message: self.reasoning,
            details,
        }
    }
}

/// Parse a `VERDICT`/`SCORE`/`REASONING` response.
pub fn parse_verdict_response(text: &str) -> Result<VerdictResponse, ParseError> {
    let mut validated = validate(text, &VERDICT_SCHEMA)?;
    Ok(VerdictResponse {
        verdict: validated.verdicts["VERDICT"],
        score: validated.scores["SCORE"],
        reasoning: validated.texts.remove("REASONING").unwrap_or_default(),
    })
}

/// Parsed multi-criterion response.
#[derive(Debug, Clone, PartialEq)]
pub struct CriteriaResponse {
    pub criteria: BTreeMap<CriterionName, Criterion>,
    pub summary: Option<String>,
}

impl CriteriaResponse {
    pub fn total_score(&self, weights: &GraderWeights) -> f64 {
        weights.weighted_total(
            self.criteria
                .iter()
                .map(|(name, criterion)| (*name, &criterion.score)),
        )
    }

    /// Build the grade: passed when the weighted total reaches the threshold.
    pub fn into_result(self, weights: &GraderWeights, passing_threshold: f64) -> GradeResult {
        let total = self.total_score(weights);
        let passed = total >= passing_threshold;
        let mut details = criteria_details(&self.criteria);
        details.insert("total_score".to_string(), json!(total));
        details.insert("passing_threshold".to_string(), json!(passing_threshold));
        let message = match self.summary {
            Some(summary) => summary,
            None => format!("total score {total:.1} (threshold {passing_threshold:.1})"),
        };
        GradeResult {
            passed,
            score: total,
            message,
            details,
        }
    }
}

/// `<label>_score` and `<label>_feedback` entries for each criterion.
pub fn criteria_details(
    criteria: &BTreeMap<CriterionName, Criterion>,
) -> BTreeMap<String, serde_json::Value> {
    let mut details = BTreeMap::new();
    for (name, criterion) in criteria {
        details.insert(format!("{}_score", name.label()), json!(criterion.score));
        details.insert(
            format!("{}_feedback", name.label()),
            json!(criterion.feedback),
        );
    }
    details
}

/// Parse a response carrying a score and feedback line for every criterion.
pub fn parse_criteria_response(text: &str) -> Result<CriteriaResponse, ParseError> {
    let mut validated = validate(text, &criteria_schema())?;
    let mut criteria = BTreeMap::new();
    for name in CriterionName::ALL {
        criteria.insert(
            name,
            Criterion {
                score: validated.scores[name.score_key()],
                feedback: validated
                    .texts
                    .remove(name.feedback_key())
                    .unwrap_or_default(),
            },
        );
    }
    Ok(CriteriaResponse {
        criteria,
        summary: validated.texts.remove("SUMMARY"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRITERIA_OK: &str = "\
CLARITY: 90
CLARITY_FEEDBACK: precise wording
COMPLETENESS: 80
COMPLETENESS_FEEDBACK: covers edge cases
TESTABILITY: 70
TESTABILITY_FEEDBACK: most criteria measurable
SCOPE: 60
SCOPE_FEEDBACK: slightly broad
";

    #[test]
    fn parses_verdict_response() {
        let text = "VERDICT: PASS\nSCORE: 85\nREASONING: Implements the task.";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(response.verdict, Verdict::Pass);
        assert_eq!(response.score, 85.0);
        assert_eq!(response.reasoning, "Implements the task.");

        let result = response.into_result();
        assert!(result.passed);
        assert_eq!(result.details["verdict"], json!("PASS"));
    }

    #[test]
    fn strips_whitespace_around_keys_and_values() {
        let text = "  VERDICT :   FAIL  \n\tSCORE:  12.5 \nREASONING:  missing tests  ";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(response.verdict, Verdict::Fail);
        assert_eq!(response.score, 12.5);
        assert_eq!(response.reasoning, "missing tests");
    }

    #[test]
    fn empty_response_fails_fast() {
        assert_eq!(parse_verdict_response(""), Err(ParseError::EmptyResponse));
        assert_eq!(
            parse_verdict_response("  \n\t "),
            Err(ParseError::EmptyResponse)
        );
    }

    #[test]
    fn each_missing_field_is_reported() {
        let full = ["VERDICT: PASS", "SCORE: 50", "REASONING: ok"];
        for (skip, field) in ["VERDICT", "SCORE", "REASONING"].into_iter().enumerate() {
            let text: Vec<&str> = full
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != skip)
                .map(|(_, line)| *line)
                .collect();
            let err = parse_verdict_response(&text.join("\n")).unwrap_err();
            assert_eq!(err, ParseError::MissingField { field });
        }
    }

    #[test]
    fn keys_are_case_sensitive() {
        let err = parse_verdict_response("verdict: PASS\nSCORE: 50\nREASONING: ok").unwrap_err();
        assert_eq!(err, ParseError::MissingField { field: "VERDICT" });
    }

    #[test]
    fn invalid_verdict_is_rejected() {
        let err = parse_verdict_response("VERDICT: MAYBE\nSCORE: 50\nREASONING: ok").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidVerdict {
                value: "MAYBE".to_string()
            }
        );
        let err = parse_verdict_response("VERDICT: pass\nSCORE: 50\nREASONING: ok").unwrap_err();
        assert!(matches!(err, ParseError::InvalidVerdict { .. }));
    }

    #[test]
    fn out_of_range_and_non_numeric_scores_are_rejected() {
        let err = parse_verdict_response("VERDICT: PASS\nSCORE: 150\nREASONING: ok").unwrap_err();
        assert_eq!(
            err,
            ParseError::ScoreOutOfRange {
                field: "SCORE",
                value: 150.0
            }
        );
        let err = parse_verdict_response("VERDICT: PASS\nSCORE: -1\nREASONING: ok").unwrap_err();
        assert!(matches!(err, ParseError::ScoreOutOfRange { .. }));
        let err = parse_verdict_response("VERDICT: PASS\nSCORE: abc\nREASONING: ok").unwrap_err();
        assert_eq!(
            err,
            ParseError::ScoreNotNumeric {
                field: "SCORE",
                value: "abc".to_string()
            }
        );
        let err = parse_verdict_response("VERDICT: PASS\nSCORE: NaN\nREASONING: ok").unwrap_err();
        assert!(matches!(err, ParseError::ScoreNotNumeric { .. }));
    }

    #[test]
    fn boundary_scores_are_accepted() {
        for score in ["0", "100", "0.0", "100.0"] {
            let text = format!("VERDICT: FAIL\nSCORE: {score}\nREASONING: ok");
            assert!(parse_verdict_response(&text).is_ok(), "score {score}");
        }
    }

    #[test]
    fn first_occurrence_wins() {
        let text = "VERDICT: FAIL\nVERDICT: PASS\nSCORE: 10\nSCORE: 90\nREASONING: first";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(response.verdict, Verdict::Fail);
        assert_eq!(response.score, 10.0);
    }

    #[test]
    fn reasoning_keeps_continuation_lines() {
        let text = "VERDICT: PASS\nSCORE: 70\nREASONING: first line\n- second point\n\nthird";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(response.reasoning, "first line\n- second point\nthird");
    }

    #[test]
    fn empty_occurrence_does_not_hide_later_value() {
        let text = "VERDICT: PASS\nSCORE: 70\nREASONING:\nREASONING: real reason";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(response.reasoning, "real reason");
    }

    #[test]
    fn unknown_uppercase_keys_continue_the_previous_field() {
        let text = "VERDICT: FAIL\nSCORE: 20\nREASONING: The change breaks the API.\nNOTE: callers in cli.rs still pass two args.\nHTTP: 500 on /login";
        let response = parse_verdict_response(text).expect("parse");
        assert_eq!(
            response.reasoning,
            "The change breaks the API.\nNOTE: callers in cli.rs still pass two args.\nHTTP: 500 on /login"
        );
    }

    #[test]
    fn empty_required_value_counts_as_missing() {
        let err = parse_verdict_response("VERDICT: PASS\nSCORE: 70\nREASONING:").unwrap_err();
        assert_eq!(err, ParseError::MissingField { field: "REASONING" });
    }

    #[test]
    fn parses_criteria_and_weights_total() {
        let response = parse_criteria_response(CRITERIA_OK).expect("parse");
        assert_eq!(response.criteria[&CriterionName::Clarity].score, 90.0);
        assert_eq!(
            response.criteria[&CriterionName::Scope].feedback,
            "slightly broad"
        );
        assert_eq!(response.summary, None);

        let weights = GraderWeights::default();
        // 27 + 20 + 17.5 + 12
        let result = response.into_result(&weights, 70.0);
        assert!((result.score - 76.5).abs() < 1e-9);
        assert!(result.passed);
        assert_eq!(result.details["clarity_score"], json!(90.0));
        assert_eq!(result.details["scope_feedback"], json!("slightly broad"));
    }

    #[test]
    fn criteria_threshold_is_inclusive() {
        let weights = GraderWeights {
            clarity: 0.25,
            completeness: 0.25,
            testability: 0.25,
            scope: 0.25,
        };
        let response = parse_criteria_response(CRITERIA_OK).expect("parse");
        let result = response.clone().into_result(&weights, 75.0);
        assert_eq!(result.score, 75.0);
        assert!(result.passed);
        let result = response.into_result(&weights, 75.5);
        assert!(!result.passed);
    }

    #[test]
    fn criteria_missing_feedback_is_error() {
        let text = CRITERIA_OK.replace("TESTABILITY_FEEDBACK: most criteria measurable\n", "");
        let err = parse_criteria_response(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::MissingField {
                field: "TESTABILITY_FEEDBACK"
            }
        );
    }

    #[test]
    fn criteria_score_out_of_range_is_error() {
        let text = CRITERIA_OK.replace("SCOPE: 60", "SCOPE: 101");
        let err = parse_criteria_response(&text).unwrap_err();
        assert_eq!(
            err,
            ParseError::ScoreOutOfRange {
                field: "SCOPE",
                value: 101.0
            }
        );
    }

    #[test]
    fn criteria_summary_becomes_message() {
        let text = format!("{CRITERIA_OK}SUMMARY: solid spec\n");
        let result = parse_criteria_response(&text)
            .expect("parse")
            .into_result(&GraderWeights::default(), 70.0);
        assert_eq!(result.message, "solid spec");
    }

    #[test]
    fn tokenizer_ignores_preamble_without_keys() {
        let fields = tokenize("Here is my review.\nVERDICT: PASS", &["VERDICT"]);
        assert_eq!(
            fields,
            vec![Field {
                key: "VERDICT".to_string(),
                value: "PASS".to_string()
            }]
        );
    }
}
