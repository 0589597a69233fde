//! In-memory submission store.
//!
//! Implements [`SubmissionStore`] over process memory. Used by the CLI and by
//! tests; a deployment backed by a relational database provides its own
//! implementation.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::audit::ReviewAudit;
use crate::grading::GradeReport;
use crate::model::{Evaluation, QuestionBank, ReviewId, SubmissionId};
use crate::traits::SubmissionStore;

#[derive(Debug, Default)]
struct Tables {
    banks: HashMap<i64, QuestionBank>,
    grades: HashMap<SubmissionId, GradeReport>,
    evaluations: HashMap<SubmissionId, Evaluation>,
    audits: HashMap<ReviewId, ReviewAudit>,
}

/// Process-local [`SubmissionStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_bank(&self, bank: QuestionBank) {
        self.tables.write().await.banks.insert(bank.id, bank);
    }

    pub async fn grade(&self, submission: SubmissionId) -> Option<GradeReport> {
        self.tables.read().await.grades.get(&submission).cloned()
    }

    pub async fn evaluation(&self, submission: SubmissionId) -> Option<Evaluation> {
        self.tables.read().await.evaluations.get(&submission).cloned()
    }

    pub async fn review_audit(&self, review: ReviewId) -> Option<ReviewAudit> {
        self.tables.read().await.audits.get(&review).cloned()
    }

    /// The submission's current score: the essay band once evaluated,
    /// otherwise the structured-answer percentage.
    pub async fn score(&self, submission: SubmissionId) -> Option<f64> {
        let tables = self.tables.read().await;
        tables
            .evaluations
            .get(&submission)
            .map(|e| e.band)
            .or_else(|| tables.grades.get(&submission).map(|g| g.score))
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn question_bank(&self, bank_id: i64) -> Result<Option<QuestionBank>> {
        Ok(self.tables.read().await.banks.get(&bank_id).cloned())
    }

    async fn record_grade(&self, submission: SubmissionId, report: &GradeReport) -> Result<()> {
        self.tables
            .write()
            .await
            .grades
            .insert(submission, report.clone());
        Ok(())
    }

    async fn record_evaluation(
        &self,
        submission: SubmissionId,
        evaluation: &Evaluation,
    ) -> Result<()> {
        self.tables
            .write()
            .await
            .evaluations
            .insert(submission, evaluation.clone());
        Ok(())
    }

    async fn reference_evaluation(&self, submission: SubmissionId) -> Result<Option<Evaluation>> {
        Ok(self.evaluation(submission).await)
    }

    async fn record_review_audit(&self, review: ReviewId, audit: &ReviewAudit) -> Result<()> {
        self.tables.write().await.audits.insert(review, audit.clone());
        Ok(())
    }
}
