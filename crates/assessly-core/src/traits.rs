//! Collaborator traits.
//!
//! The core never talks to a network or a database directly. The evaluation
//! provider is implemented in `assessly-providers`; the submission store is
//! implemented by whatever persistence layer hosts the core (see
//! [`crate::store::MemoryStore`] for the in-process one).

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::audit::{AuditRequest, ReviewAudit};
use crate::grading::GradeReport;
use crate::model::{EssayPrompt, EssayType, Evaluation, QuestionBank, ReviewId, SubmissionId};
use crate::prompt;

// ---------------------------------------------------------------------------
// Evaluation provider
// ---------------------------------------------------------------------------

/// An external essay evaluator (typically an LLM endpoint).
#[async_trait]
pub trait EvaluationProvider: Send + Sync {
    /// Human-readable provider name (e.g. "openai").
    fn name(&self) -> &str;

    /// Evaluate an essay and return the raw evaluation text.
    ///
    /// Failures are expected to be transient (network, rate limits, provider
    /// errors); the caller records them as the job's result.
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String>;

    /// Audit a peer review against the reference evaluation and return the
    /// raw JSON verdict.
    async fn audit_review(&self, _request: &AuditRequest) -> Result<String> {
        anyhow::bail!("provider {} does not audit peer reviews", self.name())
    }
}

/// Everything the provider needs to evaluate one essay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationRequest {
    /// The essay text as submitted.
    pub essay: String,
    pub essay_type: EssayType,
    /// Essay question or title.
    #[serde(default)]
    pub title: Option<String>,
    /// Description of the chart a report essay is written about.
    #[serde(default)]
    pub chart_description: Option<String>,
}

impl EvaluationRequest {
    pub fn new(essay: impl Into<String>, essay_type: EssayType) -> Self {
        Self {
            essay: essay.into(),
            essay_type,
            title: None,
            chart_description: None,
        }
    }

    /// Build a request from a bank's essay metadata.
    pub fn for_prompt(essay: impl Into<String>, prompt: &EssayPrompt) -> Self {
        Self {
            essay: essay.into(),
            essay_type: prompt.essay_type(),
            title: prompt.title.clone(),
            chart_description: prompt.chart_description.clone(),
        }
    }

    pub fn system_prompt(&self) -> String {
        prompt::system_prompt(self.essay_type)
    }

    pub fn user_prompt(&self) -> String {
        prompt::user_prompt(self)
    }
}

// ---------------------------------------------------------------------------
// Persistence collaborator
// ---------------------------------------------------------------------------

/// Persistence for banks, grades, essay evaluations, and review audits.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Look up a bank's question and answer definitions.
    async fn question_bank(&self, bank_id: i64) -> Result<Option<QuestionBank>>;

    /// Append a submission's structured-answer score and per-question outcomes.
    async fn record_grade(&self, submission: SubmissionId, report: &GradeReport) -> Result<()>;

    /// Store a finished essay evaluation and its band as the submission score.
    async fn record_evaluation(&self, submission: SubmissionId, evaluation: &Evaluation)
        -> Result<()>;

    /// The latest stored evaluation of a submission's essay.
    async fn reference_evaluation(&self, submission: SubmissionId) -> Result<Option<Evaluation>>;

    /// Store the audit verdict against a peer review.
    async fn record_review_audit(&self, review: ReviewId, audit: &ReviewAudit) -> Result<()>;
}
