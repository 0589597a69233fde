//! Performance summary over recorded outcomes.

use serde::{Deserialize, Serialize};

use crate::model::{AnswerOutcome, GradedAnswer};

/// Tallies shown to a learner after grading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSummary {
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    /// Indeterminate outcomes: unanswered or not attributable.
    pub unanswered: usize,
    /// `100 * correct / total`, or 0 for an empty submission.
    pub accuracy: f64,
}

impl PerformanceSummary {
    pub fn from_answers(answers: &[GradedAnswer]) -> Self {
        Self::from_outcomes(answers.iter().map(|a| a.outcome))
    }

    pub fn from_outcomes(outcomes: impl IntoIterator<Item = AnswerOutcome>) -> Self {
        let (mut total, mut correct, mut incorrect, mut unanswered) = (0, 0, 0, 0);
        for outcome in outcomes {
            total += 1;
            match outcome {
                AnswerOutcome::Correct => correct += 1,
                AnswerOutcome::Incorrect => incorrect += 1,
                AnswerOutcome::Indeterminate => unanswered += 1,
            }
        }

        let accuracy = if total > 0 {
            correct as f64 / total as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total,
            correct,
            incorrect,
            unanswered,
            accuracy,
        }
    }
}
