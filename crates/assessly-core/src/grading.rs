//! Structured-answer grading.
//!
//! Applies the per-answer-type comparison policy to a learner's submission and
//! computes the percentage score. Free-text answers are left indeterminate
//! here and handed to the evaluation coordinator.
//!
//! Paired dual-letter questions share one two-letter key across two adjacent
//! sub-questions. Their outcomes come from a small decision table keyed on
//! [`PairSubmission`], kept in [`pair_outcomes`] so each row can be tested
//! on its own.

use serde::{Deserialize, Serialize};

use crate::error::GradingError;
use crate::model::{
    AnswerGroup, AnswerKind, AnswerOutcome, GradedAnswer, Question, QuestionBank, SubmittedAnswer,
    SubmittedAnswers,
};

/// Result of grading one submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    /// Per-sub-question outcomes in submission order.
    pub answers: Vec<GradedAnswer>,
    /// Number of `Correct` outcomes among locally graded sub-questions.
    pub correct: usize,
    /// Locally graded sub-questions (free text excluded).
    pub considered: usize,
    /// `100 * correct / considered`, or 0 when nothing was considered.
    pub score: f64,
    /// Free-text answers that still need an external evaluation.
    pub essays: Vec<SubmittedAnswer>,
}

/// Grade every answer group of a submission against a bank.
///
/// Answers referring to question numbers the bank does not contain are
/// skipped.
pub fn grade_submission(
    bank: &QuestionBank,
    submitted: &SubmittedAnswers,
) -> Result<GradeReport, GradingError> {
    let mut answers = Vec::new();
    let mut essays = Vec::new();

    for group in &submitted.groups {
        match group.kind {
            AnswerKind::FreeText => {
                for (question, entry) in resolve(bank, group) {
                    let text = entry.answer.trim().to_string();
                    answers.push(GradedAnswer {
                        question: question.number,
                        kind: AnswerKind::FreeText,
                        user_answer: Some(text.clone()),
                        correct_answer: question.answer.trim().to_string(),
                        outcome: AnswerOutcome::Indeterminate,
                    });
                    essays.push(SubmittedAnswer {
                        question: question.number,
                        answer: text,
                    });
                }
            }
            AnswerKind::ExactMatch => {
                for (question, entry) in resolve(bank, group) {
                    answers.push(grade_exact(question, &entry.answer));
                }
            }
            AnswerKind::PairedChoice => {
                let resolved: Vec<_> = resolve(bank, group).collect();
                let mut pairs = resolved.chunks_exact(2);
                for pair in &mut pairs {
                    let (first, entry) = pair[0];
                    let (second, _) = pair[1];
                    answers.extend(grade_pair(first, second, &entry.answer)?);
                }
                if let [(question, _)] = pairs.remainder() {
                    tracing::warn!(
                        bank = bank.id,
                        question = question.number,
                        "dropping unpaired dual-letter sub-question"
                    );
                }
            }
        }
    }

    let considered = answers
        .iter()
        .filter(|a| a.kind != AnswerKind::FreeText)
        .count();
    let correct = answers
        .iter()
        .filter(|a| a.kind != AnswerKind::FreeText && a.outcome == AnswerOutcome::Correct)
        .count();

    Ok(GradeReport {
        answers,
        correct,
        considered,
        score: percentage(correct, considered),
        essays,
    })
}

fn percentage(correct: usize, considered: usize) -> f64 {
    if considered == 0 {
        0.0
    } else {
        correct as f64 / considered as f64 * 100.0
    }
}

/// Pair each submitted answer with its bank question, skipping unknown numbers.
fn resolve<'a>(
    bank: &'a QuestionBank,
    group: &'a AnswerGroup,
) -> impl Iterator<Item = (&'a Question, &'a SubmittedAnswer)> + 'a {
    group.answers.iter().filter_map(move |entry| {
        let question = bank.question(entry.question);
        if question.is_none() {
            tracing::warn!(
                bank = bank.id,
                question = entry.question,
                "submitted answer for unknown question"
            );
        }
        question.map(|q| (q, entry))
    })
}

// ---------------------------------------------------------------------------
// Exact / alternative match
// ---------------------------------------------------------------------------

/// Check a trimmed answer against the `|`-separated accepted alternatives.
pub fn exact_outcome(key: &str, submitted: &str) -> AnswerOutcome {
    let submitted = submitted.trim();
    if submitted.is_empty() {
        return AnswerOutcome::Indeterminate;
    }
    AnswerOutcome::from_correct(key.trim().split('|').any(|alt| alt == submitted))
}

fn grade_exact(question: &Question, submitted: &str) -> GradedAnswer {
    GradedAnswer {
        question: question.number,
        kind: AnswerKind::ExactMatch,
        user_answer: Some(submitted.trim().to_string()),
        correct_answer: question.answer.trim().to_string(),
        outcome: exact_outcome(&question.answer, submitted),
    }
}

// ---------------------------------------------------------------------------
// Paired dual-letter
// ---------------------------------------------------------------------------

/// How two submitted letters relate to a two-letter key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoubleMatch {
    /// Both key letters, in either order.
    Both,
    /// At least one submitted letter is in the key, but not both key letters.
    One,
    None,
}

/// A pair submission classified by letter count and match pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSubmission {
    Blank,
    Single { matched: bool },
    Double(DoubleMatch),
    /// More than two letters; treated as unanswered.
    Overlong,
}

/// Classify a submitted answer against the pair's key letters.
pub fn classify_pair(submitted: &str, key: [char; 2]) -> PairSubmission {
    let letters: Vec<char> = submitted.trim().chars().collect();
    let in_key = |c: char| key.contains(&c);

    match letters.as_slice() {
        [] => PairSubmission::Blank,
        [a] => PairSubmission::Single { matched: in_key(*a) },
        [a, b] => {
            let both = (*a == key[0] && *b == key[1]) || (*a == key[1] && *b == key[0]);
            PairSubmission::Double(if both {
                DoubleMatch::Both
            } else if in_key(*a) || in_key(*b) {
                DoubleMatch::One
            } else {
                DoubleMatch::None
            })
        }
        _ => PairSubmission::Overlong,
    }
}

/// Outcomes for the (first, second) sub-questions of a pair.
///
/// When only one letter is right, credit always lands on the first slot. With
/// two letters submitted the second slot is charged the miss; with a single
/// letter it stays indeterminate.
pub fn pair_outcomes(submission: PairSubmission) -> (AnswerOutcome, AnswerOutcome) {
    use AnswerOutcome::{Correct, Incorrect, Indeterminate};

    match submission {
        PairSubmission::Blank | PairSubmission::Overlong => (Indeterminate, Indeterminate),
        PairSubmission::Double(DoubleMatch::Both) => (Correct, Correct),
        PairSubmission::Double(DoubleMatch::One) => (Correct, Incorrect),
        PairSubmission::Double(DoubleMatch::None) => (Incorrect, Incorrect),
        PairSubmission::Single { matched: true } => (Correct, Indeterminate),
        PairSubmission::Single { matched: false } => (Incorrect, Incorrect),
    }
}

/// Parse the two key letters from the first sub-question's answer.
fn pair_key(question: &Question) -> Result<[char; 2], GradingError> {
    let mut chars = question.answer.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(a), Some(b)) => Ok([a, b]),
        _ => Err(GradingError::MalformedPairAnswer {
            question: question.number,
            answer: question.answer.clone(),
        }),
    }
}

/// Grade a pair of sub-questions. Only the first sub-question's submitted
/// answer and key are consulted; the pair shares them.
fn grade_pair(
    first: &Question,
    second: &Question,
    submitted: &str,
) -> Result<[GradedAnswer; 2], GradingError> {
    let key = pair_key(first)?;
    let submission = classify_pair(submitted, key);
    let (first_outcome, second_outcome) = pair_outcomes(submission);

    let user_answer = match submission {
        PairSubmission::Blank | PairSubmission::Overlong => None,
        _ => Some(submitted.trim().to_string()),
    };

    let graded = |question: &Question, outcome| GradedAnswer {
        question: question.number,
        kind: AnswerKind::PairedChoice,
        user_answer: user_answer.clone(),
        correct_answer: question.answer.trim().to_string(),
        outcome,
    };

    Ok([graded(first, first_outcome), graded(second, second_outcome)])
}
