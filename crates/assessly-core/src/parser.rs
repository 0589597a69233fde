//! Provider response parser.
//!
//! Extracts `KEY: digit` criterion scores and the trailing rationale from the
//! free text an evaluation provider returns.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::ParseError;
use crate::model::{Criterion, ParsedEvaluation, StructuredScore, TaskScore};

/// Marker that introduces the free-text rationale.
pub const RATIONALE_MARKER: &str = "Evaluation:";

fn score_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\b(TA|TR|CC|LR|GRA):\s*([0-9])").expect("score pattern is a valid regex")
    })
}

fn rationale_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(&format!("(?i){}", regex::escape(RATIONALE_MARKER)))
            .expect("rationale pattern is a valid regex")
    })
}

/// Parse provider output into structured scores and a rationale.
///
/// Later occurrences of a key overwrite earlier ones. Criteria other than the
/// task score default to 0 when absent, which [`StructuredScore::validate`]
/// rejects. If both task keys appear, task achievement wins.
pub fn parse_evaluation(text: &str) -> Result<ParsedEvaluation, ParseError> {
    let mut achievement = None;
    let mut response = None;
    let mut coherence = 0;
    let mut lexical = 0;
    let mut grammar = 0;

    for caps in score_pattern().captures_iter(text) {
        let Some(criterion) = Criterion::from_marker(&caps[1]) else {
            continue;
        };
        let Some(value) = caps[2].chars().next().and_then(|c| c.to_digit(10)) else {
            continue;
        };
        let value = value as u8;
        match criterion {
            Criterion::TaskAchievement => achievement = Some(value),
            Criterion::TaskResponse => response = Some(value),
            Criterion::Coherence => coherence = value,
            Criterion::Lexical => lexical = value,
            Criterion::Grammar => grammar = value,
        }
    }

    let task = match (achievement, response) {
        (Some(v), _) => TaskScore::Achievement(v),
        (None, Some(v)) => TaskScore::Response(v),
        (None, None) => return Err(ParseError::MissingTaskScore),
    };

    Ok(ParsedEvaluation {
        scores: StructuredScore {
            coherence,
            lexical,
            grammar,
            task,
        },
        evaluation: extract_rationale(text),
    })
}

/// Everything after the last case-insensitive rationale marker, trimmed.
/// Without a marker the whole text is the rationale.
pub fn extract_rationale(text: &str) -> String {
    match rationale_pattern().find_iter(text).last() {
        Some(m) => text[m.end()..].trim().to_string(),
        None => text.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_inside_words_are_ignored() {
        let parsed = parse_evaluation("Chart DATA: 5 series\nTR: 6\nCC: 6\nLR: 6\nGRA: 6").unwrap();
        assert_eq!(parsed.scores.task, TaskScore::Response(6));

        let err = parse_evaluation("METADATA: 3\nCC: 6").unwrap_err();
        assert_eq!(err, ParseError::MissingTaskScore);
    }

    #[test]
    fn parses_task_response_essay() {
        let parsed =
            parse_evaluation("TR: 7\nCC: 6\nLR: 8\nGRA: 7\nEvaluation: Good structure").unwrap();
        assert_eq!(parsed.scores.task, TaskScore::Response(7));
        assert_eq!(parsed.scores.coherence, 6);
        assert_eq!(parsed.scores.lexical, 8);
        assert_eq!(parsed.scores.grammar, 7);
        assert_eq!(parsed.evaluation, "Good structure");
    }

    #[test]
    fn missing_task_score_fails() {
        assert_eq!(
            parse_evaluation("CC: 5").unwrap_err(),
            ParseError::MissingTaskScore
        );
    }

    #[test]
    fn last_occurrence_wins() {
        let parsed = parse_evaluation("TA: 5\nCC: 4\nTA: 6\nCC: 7\nLR: 6\nGRA: 6").unwrap();
        assert_eq!(parsed.scores.task, TaskScore::Achievement(6));
        assert_eq!(parsed.scores.coherence, 7);
    }

    #[test]
    fn achievement_preferred_when_both_present() {
        let parsed = parse_evaluation("TR: 5\nTA: 8\nCC: 6\nLR: 6\nGRA: 6").unwrap();
        assert_eq!(parsed.scores.task, TaskScore::Achievement(8));
    }

    #[test]
    fn tolerates_missing_whitespace_and_inline_keys() {
        let parsed = parse_evaluation("Scores -> TR:6, CC:  5, LR:7, GRA:6").unwrap();
        assert_eq!(parsed.scores.task.value(), 6);
        assert_eq!(parsed.scores.coherence, 5);
        assert_eq!(parsed.scores.lexical, 7);
    }

    #[test]
    fn missing_criterion_defaults_to_zero() {
        let parsed = parse_evaluation("TR: 6\nCC: 6\nLR: 6").unwrap();
        assert_eq!(parsed.scores.grammar, 0);
        assert!(parsed.scores.validate().is_err());
    }

    #[test]
    fn rationale_uses_last_marker_case_insensitively() {
        let text = "TR: 6\nevaluation: draft\nEVALUATION:  Final notes here \n";
        assert_eq!(extract_rationale(text), "Final notes here");
    }

    #[test]
    fn rationale_without_marker_is_whole_text() {
        assert_eq!(extract_rationale("  TR: 6\nCC: 5  "), "TR: 6\nCC: 5");
    }
}
