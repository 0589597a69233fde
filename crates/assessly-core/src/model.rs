//! Core data model types for assessly.
//!
//! Question banks, submitted answers, per-question outcomes, and the
//! structured essay scores produced by the evaluation pipeline.

use std::fmt;
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ScoreRangeError;
use crate::rounding::round_to_half;

/// Caller-supplied identity of a submission; unique per submission.
pub type SubmissionId = i64;

/// Identifier of a stored peer review.
pub type ReviewId = i64;

/// Lowest and highest band a criterion can be awarded.
pub const MIN_BAND: u8 = 1;
pub const MAX_BAND: u8 = 9;

// ---------------------------------------------------------------------------
// Essays and structured scores
// ---------------------------------------------------------------------------

/// Which kind of essay is being evaluated.
///
/// Report essays describe a chart and are scored on task achievement;
/// argument essays are scored on task response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EssayType {
    Report,
    Argument,
}

impl EssayType {
    /// Map a bank's task number onto an essay type (1 = report).
    pub fn from_task_number(task: u32) -> Self {
        if task == 1 {
            EssayType::Report
        } else {
            EssayType::Argument
        }
    }

    /// The task-type criterion this essay is scored on.
    pub fn task_criterion(self) -> Criterion {
        match self {
            EssayType::Report => Criterion::TaskAchievement,
            EssayType::Argument => Criterion::TaskResponse,
        }
    }

    pub fn task_label(self) -> &'static str {
        match self {
            EssayType::Report => "Task 1",
            EssayType::Argument => "Task 2",
        }
    }
}

impl fmt::Display for EssayType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EssayType::Report => write!(f, "report"),
            EssayType::Argument => write!(f, "argument"),
        }
    }
}

impl FromStr for EssayType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "report" | "task1" | "1" => Ok(EssayType::Report),
            "argument" | "task2" | "2" => Ok(EssayType::Argument),
            other => Err(format!("unknown essay type: {other}")),
        }
    }
}

/// One scoring dimension of an essay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    TaskAchievement,
    TaskResponse,
    #[serde(rename = "coherence_cohesion")]
    Coherence,
    #[serde(rename = "lexical_resource")]
    Lexical,
    #[serde(rename = "grammatical_accuracy")]
    Grammar,
}

impl Criterion {
    pub const ALL: [Criterion; 5] = [
        Criterion::TaskAchievement,
        Criterion::TaskResponse,
        Criterion::Coherence,
        Criterion::Lexical,
        Criterion::Grammar,
    ];

    /// The abbreviation the provider uses in its `KEY: score` lines.
    pub fn marker(self) -> &'static str {
        match self {
            Criterion::TaskAchievement => "TA",
            Criterion::TaskResponse => "TR",
            Criterion::Coherence => "CC",
            Criterion::Lexical => "LR",
            Criterion::Grammar => "GRA",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        Criterion::ALL.into_iter().find(|c| c.marker() == marker)
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// The task-type score; exactly one of the two is ever present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskScore {
    #[serde(rename = "task_achievement")]
    Achievement(u8),
    #[serde(rename = "task_response")]
    Response(u8),
}

impl TaskScore {
    pub fn criterion(self) -> Criterion {
        match self {
            TaskScore::Achievement(_) => Criterion::TaskAchievement,
            TaskScore::Response(_) => Criterion::TaskResponse,
        }
    }

    pub fn value(self) -> u8 {
        match self {
            TaskScore::Achievement(v) | TaskScore::Response(v) => v,
        }
    }
}

/// Per-criterion band scores for one essay.
///
/// Serializes as a flat map, e.g.
/// `{"coherence_cohesion": 6, "lexical_resource": 8, "grammatical_accuracy": 7, "task_response": 7}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StructuredScore {
    #[serde(rename = "coherence_cohesion")]
    pub coherence: u8,
    #[serde(rename = "lexical_resource")]
    pub lexical: u8,
    #[serde(rename = "grammatical_accuracy")]
    pub grammar: u8,
    #[serde(flatten)]
    pub task: TaskScore,
}

impl StructuredScore {
    /// All four criterion scores, task criterion first.
    pub fn entries(&self) -> [(Criterion, u8); 4] {
        [
            (self.task.criterion(), self.task.value()),
            (Criterion::Coherence, self.coherence),
            (Criterion::Lexical, self.lexical),
            (Criterion::Grammar, self.grammar),
        ]
    }

    pub fn get(&self, criterion: Criterion) -> Option<u8> {
        self.entries()
            .into_iter()
            .find(|(c, _)| *c == criterion)
            .map(|(_, v)| v)
    }

    /// Check that every criterion lies within the band range.
    pub fn validate(&self) -> Result<(), ScoreRangeError> {
        for (criterion, value) in self.entries() {
            if !(MIN_BAND..=MAX_BAND).contains(&value) {
                return Err(ScoreRangeError { criterion, value });
            }
        }
        Ok(())
    }

    /// Unrounded mean of the four criterion scores.
    pub fn average(&self) -> f64 {
        let entries = self.entries();
        let sum: u32 = entries.iter().map(|(_, v)| u32::from(*v)).sum();
        f64::from(sum) / entries.len() as f64
    }
}

/// Parsed provider output: the scores plus the free-text rationale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedEvaluation {
    pub scores: StructuredScore,
    pub evaluation: String,
}

/// A finished essay evaluation as stored in a job result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub scores: StructuredScore,
    pub evaluation: String,
    /// Overall band: the criterion mean rounded to the nearest half.
    pub band: f64,
}

impl Evaluation {
    /// Check the parsed scores are in band range and compute the band.
    pub fn from_parsed(parsed: ParsedEvaluation) -> Result<Self, ScoreRangeError> {
        parsed.scores.validate()?;
        Ok(Self {
            band: round_to_half(parsed.scores.average()),
            scores: parsed.scores,
            evaluation: parsed.evaluation,
        })
    }
}

// ---------------------------------------------------------------------------
// Question banks
// ---------------------------------------------------------------------------

/// How a sub-question's answer is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Essay answer, scored by the external evaluator.
    FreeText,
    /// Literal answer with `|`-separated alternatives.
    ExactMatch,
    /// Two adjacent sub-questions sharing one two-letter answer.
    PairedChoice,
}

impl AnswerKind {
    /// Classify a submitted answer group by its key.
    pub fn from_group_key(key: &str) -> Self {
        match key {
            "multiChoice" => AnswerKind::PairedChoice,
            "write" => AnswerKind::FreeText,
            _ => AnswerKind::ExactMatch,
        }
    }
}

/// One sub-question of a bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub number: u32,
    /// Correct answer; `|`-separated alternatives for exact-match questions,
    /// two letters for paired questions, empty for free text.
    #[serde(default)]
    pub answer: String,
    pub kind: AnswerKind,
}

/// Essay metadata used to build the evaluation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EssayPrompt {
    /// Task number of the bank (1 = report, 2 = argument).
    pub task: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub chart_description: Option<String>,
}

impl EssayPrompt {
    pub fn essay_type(&self) -> EssayType {
        EssayType::from_task_number(self.task)
    }
}

/// A question bank: the answer key for one exercise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionBank {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub essay: Option<EssayPrompt>,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuestionBank {
    pub fn question(&self, number: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.number == number)
    }
}

// ---------------------------------------------------------------------------
// Submissions and outcomes
// ---------------------------------------------------------------------------

/// Tri-state correctness of one sub-question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
    /// Unanswered, or not attributable to this sub-question.
    Indeterminate,
}

impl AnswerOutcome {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        }
    }
}

impl fmt::Display for AnswerOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerOutcome::Correct => write!(f, "correct"),
            AnswerOutcome::Incorrect => write!(f, "incorrect"),
            AnswerOutcome::Indeterminate => write!(f, "indeterminate"),
        }
    }
}

/// The graded result for one sub-question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradedAnswer {
    pub question: u32,
    pub kind: AnswerKind,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub outcome: AnswerOutcome,
}

/// One submitted answer, keyed by question number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswer {
    pub question: u32,
    pub answer: String,
}

/// Answers of a single answer-type group, in submission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerGroup {
    pub kind: AnswerKind,
    pub answers: Vec<SubmittedAnswer>,
}

/// A learner's raw answers grouped by answer type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedAnswers {
    pub groups: Vec<AnswerGroup>,
}

impl SubmittedAnswers {
    /// Build from the request-layer JSON shape:
    /// `{"judgement": {"1": "Y"}, "multiChoice": {"20": "BC", "21": "BC"}, "write": {"30": "..."}}`.
    ///
    /// Group and answer order follow the JSON document. Keys that are not
    /// question numbers are skipped.
    pub fn from_json(value: &Value) -> Result<Self> {
        let groups = value
            .as_object()
            .context("answers must be a JSON object keyed by answer type")?;

        let mut result = SubmittedAnswers::default();
        for (key, entries) in groups {
            let entries = entries
                .as_object()
                .with_context(|| format!("answer group {key:?} must be an object"))?;

            let answers = entries
                .iter()
                .filter_map(|(number, raw)| match number.trim().parse::<u32>() {
                    Ok(question) => Some(SubmittedAnswer {
                        question,
                        answer: answer_text(raw),
                    }),
                    Err(_) => {
                        tracing::debug!("skipping non-numeric question key {number:?} in {key}");
                        None
                    }
                })
                .collect();

            result.groups.push(AnswerGroup {
                kind: AnswerKind::from_group_key(key),
                answers,
            });
        }
        Ok(result)
    }
}

fn answer_text(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
