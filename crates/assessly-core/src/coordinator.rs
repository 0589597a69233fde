//! Essay evaluation coordinator.
//!
//! Accepts submissions from the request layer, grades structured answers
//! synchronously, and runs free-text evaluation in the background:
//! provider call, response parsing, score validation, half-band rounding,
//! persistence, then job completion. Pollers query the job with a bounded
//! wait through [`EvaluationCoordinator::get_status`].
//!
//! Background failures never escape the evaluation task. Each one becomes the
//! job's terminal [`JobResult::Failed`] so that pollers always get an answer.
//!
//! Peer reviews are audited in the caller's task against the stored
//! evaluation through [`EvaluationCoordinator::audit_review`].

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::audit::{parse_review_audit, AuditRequest, PeerReview, ReviewAudit};
use crate::error::{ErrorDescriptor, ErrorKind, RegistryError};
use crate::grading::{grade_submission, GradeReport};
use crate::model::{Evaluation, QuestionBank, ReviewId, SubmissionId, SubmittedAnswers};
use crate::parser::parse_evaluation;
use crate::registry::{JobHandle, JobRegistry, JobResult, Registration, WaitOutcome};
use crate::traits::{EvaluationProvider, EvaluationRequest, SubmissionStore};

/// Configuration for the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Default bound on how long a status poll may wait.
    pub poll_timeout: Duration,
    /// Retry hint returned to pollers whose job is still processing.
    pub retry_after: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(30),
            retry_after: Duration::from_secs(5),
        }
    }
}

/// Answer to a status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum EvaluationStatus {
    Done { result: JobResult },
    Processing { retry_after_secs: u64 },
    /// No job for this submission: never registered, or already reaped.
    /// The caller should fall back to persisted data.
    Untracked,
}

/// Result of [`EvaluationCoordinator::submit`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionOutcome {
    pub submission: SubmissionId,
    pub grade: GradeReport,
    pub evaluation_started: bool,
}

/// Coordinates grading, background essay evaluation, and review audits.
pub struct EvaluationCoordinator {
    registry: Arc<JobRegistry>,
    provider: Arc<dyn EvaluationProvider>,
    store: Arc<dyn SubmissionStore>,
    config: CoordinatorConfig,
}

impl EvaluationCoordinator {
    pub fn new(
        registry: Arc<JobRegistry>,
        provider: Arc<dyn EvaluationProvider>,
        store: Arc<dyn SubmissionStore>,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            registry,
            provider,
            store,
            config,
        }
    }

    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    pub fn config(&self) -> CoordinatorConfig {
        self.config
    }

    /// Register an evaluation job and start it in the background.
    ///
    /// Fails with [`RegistryError::DuplicateActiveJob`] if an evaluation for
    /// this submission is still running. A finished job for the same
    /// submission is replaced. Must be called inside a tokio runtime.
    pub fn register_evaluation(
        &self,
        submission: SubmissionId,
        request: EvaluationRequest,
    ) -> Result<JobHandle, RegistryError> {
        let handle = self.registry.register(submission, Registration::Restart)?;
        self.start_evaluation(submission, request);
        Ok(handle)
    }

    fn start_evaluation(&self, submission: SubmissionId, request: EvaluationRequest) {
        let worker = tokio::spawn(evaluate(
            Arc::clone(&self.provider),
            Arc::clone(&self.store),
            submission,
            request,
        ));

        // A panicking worker must still resolve the job.
        let registry = Arc::clone(&self.registry);
        tokio::spawn(async move {
            let result = match worker.await {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(submission, "evaluation task aborted: {e}");
                    JobResult::Failed(ErrorDescriptor::new(
                        ErrorKind::Internal,
                        format!("evaluation task aborted: {e}"),
                    ))
                }
            };
            registry.complete(submission, result);
        });
    }

    /// Poll a submission's evaluation, waiting at most `timeout` (or the
    /// configured poll timeout) for it to finish.
    pub async fn get_status(
        &self,
        submission: SubmissionId,
        timeout: Option<Duration>,
    ) -> EvaluationStatus {
        let timeout = timeout.unwrap_or(self.config.poll_timeout);
        match self.registry.await_result(submission, timeout).await {
            None => EvaluationStatus::Untracked,
            Some(WaitOutcome::Done(result)) => EvaluationStatus::Done { result },
            Some(WaitOutcome::StillProcessing) => EvaluationStatus::Processing {
                retry_after_secs: self.config.retry_after.as_secs(),
            },
        }
    }

    /// Grade a submission, persist the grade, and start the essay evaluation
    /// for its first free-text answer, if any.
    ///
    /// The evaluation job is reserved before the grade is written, so a
    /// submission whose evaluation is still running is rejected with
    /// [`RegistryError::DuplicateActiveJob`] and nothing is stored.
    pub async fn submit(
        &self,
        submission: SubmissionId,
        bank: &QuestionBank,
        answers: &SubmittedAnswers,
    ) -> Result<SubmissionOutcome> {
        let grade = grade_submission(bank, answers)
            .with_context(|| format!("failed to grade submission {submission}"))?;

        let request = match grade.essays.first() {
            Some(essay) => {
                let prompt = bank.essay.as_ref().with_context(|| {
                    format!(
                        "bank {} has free-text answers but no essay prompt",
                        bank.id
                    )
                })?;
                if grade.essays.len() > 1 {
                    tracing::warn!(
                        submission,
                        "{} free-text answers submitted; only the first is evaluated",
                        grade.essays.len()
                    );
                }
                Some(EvaluationRequest::for_prompt(essay.answer.clone(), prompt))
            }
            None => None,
        };

        if request.is_some() {
            self.registry.register(submission, Registration::Restart)?;
        }

        if let Err(e) = self.store.record_grade(submission, &grade).await {
            if request.is_some() {
                self.registry.complete(
                    submission,
                    JobResult::Failed(ErrorDescriptor::new(
                        ErrorKind::Persistence,
                        format!("grade was not recorded: {e:#}"),
                    )),
                );
            }
            return Err(e.context(format!("failed to record grade for submission {submission}")));
        }

        let evaluation_started = match request {
            Some(request) => {
                self.start_evaluation(submission, request);
                true
            }
            None => false,
        };

        Ok(SubmissionOutcome {
            submission,
            grade,
            evaluation_started,
        })
    }

    /// Like [`submit`](Self::submit), with the bank looked up in the store.
    pub async fn submit_for_bank(
        &self,
        submission: SubmissionId,
        bank_id: i64,
        answers: &SubmittedAnswers,
    ) -> Result<SubmissionOutcome> {
        let bank = self
            .store
            .question_bank(bank_id)
            .await
            .with_context(|| format!("failed to load bank {bank_id}"))?
            .with_context(|| format!("unknown bank {bank_id}"))?;
        self.submit(submission, &bank, answers).await
    }

    /// Audit a peer review against the stored evaluation of the reviewed
    /// submission and record the verdict.
    pub async fn audit_review(
        &self,
        review_id: ReviewId,
        essay: &str,
        review: PeerReview,
    ) -> Result<ReviewAudit> {
        let submission = review.submission;
        let reference = self
            .store
            .reference_evaluation(submission)
            .await
            .with_context(|| format!("failed to load evaluation of submission {submission}"))?
            .with_context(|| {
                format!("submission {submission} has no evaluation to audit review {review_id} against")
            })?;

        let request = AuditRequest {
            essay: essay.to_string(),
            reference,
            review,
        };
        let raw = self
            .provider
            .audit_review(&request)
            .await
            .with_context(|| format!("audit of review {review_id} failed"))?;
        let audit = parse_review_audit(&raw)
            .with_context(|| format!("audit of review {review_id} failed"))?;

        self.store
            .record_review_audit(review_id, &audit)
            .await
            .with_context(|| format!("failed to record audit of review {review_id}"))?;

        tracing::info!(
            review = review_id,
            submission,
            is_fake = audit.is_fake,
            confidence = audit.confidence,
            "peer review audited"
        );
        Ok(audit)
    }
}

/// The background evaluation routine. Never fails; errors become the result.
async fn evaluate(
    provider: Arc<dyn EvaluationProvider>,
    store: Arc<dyn SubmissionStore>,
    submission: SubmissionId,
    request: EvaluationRequest,
) -> JobResult {
    match run_evaluation(provider.as_ref(), store.as_ref(), submission, &request).await {
        Ok(evaluation) => JobResult::Scored(evaluation),
        Err(failure) => {
            tracing::error!(
                submission,
                provider = provider.name(),
                "essay evaluation failed: {failure}"
            );
            JobResult::Failed(failure)
        }
    }
}

async fn run_evaluation(
    provider: &dyn EvaluationProvider,
    store: &dyn SubmissionStore,
    submission: SubmissionId,
    request: &EvaluationRequest,
) -> Result<Evaluation, ErrorDescriptor> {
    let raw = provider
        .evaluate(request)
        .await
        .map_err(|e| ErrorDescriptor::provider(&e))?;

    let evaluation = Evaluation::from_parsed(parse_evaluation(&raw)?)?;

    store
        .record_evaluation(submission, &evaluation)
        .await
        .map_err(|e| ErrorDescriptor::new(ErrorKind::Persistence, format!("{e:#}")))?;

    Ok(evaluation)
}
