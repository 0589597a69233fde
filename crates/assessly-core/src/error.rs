//! Error types for the assessment core.
//!
//! Synchronous operations (assignment, registration, parsing) fail fast with
//! these typed errors. Background evaluation failures are never propagated;
//! they are folded into an [`ErrorDescriptor`] and stored as the job result.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{Criterion, SubmissionId};

/// Errors that can occur when interacting with an evaluation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The API returned a 429 rate limit response.
    #[error("rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },

    /// Authentication failed (invalid API key).
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The requested model was not found.
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// The API returned an error response.
    #[error("API error (HTTP {status}): {message}")]
    ApiError { status: u16, message: String },

    /// The request timed out.
    #[error("request timed out after {0}s")]
    Timeout(u64),

    /// A network error occurred.
    #[error("network error: {0}")]
    NetworkError(String),
}

/// Failure to extract structured scores from provider output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Neither a task-achievement nor a task-response score was present.
    #[error("missing task score")]
    MissingTaskScore,
}

/// Failure to read a review audit verdict from provider output.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuditError {
    #[error("malformed review audit: {0}")]
    Malformed(String),

    #[error("review audit confidence {0} is outside 0-100")]
    ConfidenceOutOfRange(String),
}

/// A parsed score outside the band range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid score range: {criterion} = {value}")]
pub struct ScoreRangeError {
    pub criterion: Criterion,
    pub value: u8,
}

/// Errors from the peer-review assignment engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssignmentError {
    #[error("not enough students to assign peer reviews: cohort has {size}")]
    InsufficientCohort { size: usize },

    #[error("invalid review count {count}: must be between 1 and {}", cohort.saturating_sub(1))]
    InvalidReviewCount { count: i64, cohort: usize },

    #[error("failed to create balanced peer review assignments (identity #{position})")]
    AssignmentImbalance { position: usize },

    #[error("malformed review set: {0:?}")]
    MalformedReviewSet(String),
}

/// Errors from the job registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("evaluation already in progress for submission {0}")]
    DuplicateActiveJob(SubmissionId),
}

/// Errors from the grading state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GradingError {
    #[error("question {question} has malformed paired answer {answer:?}: expected two letters")]
    MalformedPairAnswer { question: u32, answer: String },
}

/// Classifies a failed evaluation for the poller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorKind {
    Provider,
    Parse,
    Validation,
    Persistence,
    Internal,
}

/// Terminal failure stored as a job's result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    #[serde(rename = "error")]
    pub message: String,
}

impl ErrorDescriptor {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Wrap a provider failure, keeping the full context chain.
    pub fn provider(err: &anyhow::Error) -> Self {
        Self::new(ErrorKind::Provider, format!("{err:#}"))
    }
}

impl std::fmt::Display for ErrorDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} failure: {}", self.kind, self.message)
    }
}

impl From<ParseError> for ErrorDescriptor {
    fn from(err: ParseError) -> Self {
        Self::new(ErrorKind::Parse, err.to_string())
    }
}

impl From<ScoreRangeError> for ErrorDescriptor {
    fn from(err: ScoreRangeError) -> Self {
        Self::new(ErrorKind::Validation, err.to_string())
    }
}
