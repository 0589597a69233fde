pub mod assign;
pub mod audit;
pub mod evaluate;
pub mod grade;
pub mod init;
pub mod parse;
pub mod validate;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use comfy_table::{Cell, Table};

use assessly_core::coordinator::{EvaluationCoordinator, EvaluationStatus};
use assessly_core::model::{Evaluation, SubmissionId};
use assessly_core::registry::{JobRegistry, JobResult, ReaperHandle};
use assessly_core::store::MemoryStore;
use assessly_providers::{create_provider, AssesslyConfig};

/// A coordinator wired to the configured provider and an in-memory store.
pub struct Runtime {
    pub coordinator: EvaluationCoordinator,
    pub store: Arc<MemoryStore>,
    _reaper: ReaperHandle,
}

impl Runtime {
    pub fn from_config(config_path: Option<&Path>) -> Result<Self> {
        let config: AssesslyConfig = assessly_providers::config::load_config_from(config_path)?;
        tracing::debug!(provider = ?config.provider, "loaded configuration");

        let provider = create_provider(&config.provider)?;
        let registry = Arc::new(JobRegistry::new(config.coordinator.registry_config()));
        let reaper = registry.spawn_reaper();
        let store = Arc::new(MemoryStore::new());
        let coordinator = EvaluationCoordinator::new(
            registry,
            Arc::from(provider),
            store.clone(),
            config.coordinator.coordinator_config(),
        );
        Ok(Self {
            coordinator,
            store,
            _reaper: reaper,
        })
    }

    /// Poll until the evaluation finishes, the way a client of the request
    /// layer would.
    pub async fn wait_for(&self, submission: SubmissionId) -> Result<Evaluation> {
        loop {
            match self.coordinator.get_status(submission, None).await {
                EvaluationStatus::Done {
                    result: JobResult::Scored(evaluation),
                } => return Ok(evaluation),
                EvaluationStatus::Done {
                    result: JobResult::Failed(failure),
                } => anyhow::bail!("evaluation failed: {failure}"),
                EvaluationStatus::Processing { retry_after_secs } => {
                    tracing::info!("evaluation still running, polling again in {retry_after_secs}s");
                    tokio::time::sleep(Duration::from_secs(retry_after_secs)).await;
                }
                EvaluationStatus::Untracked => {
                    anyhow::bail!("no evaluation is tracked for submission {submission}")
                }
            }
        }
    }
}

pub fn evaluation_table(evaluation: &Evaluation) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Criterion", "Score"]);
    for (criterion, score) in evaluation.scores.entries() {
        table.add_row(vec![
            Cell::new(format!("{criterion} ({})", criterion.marker())),
            Cell::new(score),
        ]);
    }
    table.add_row(vec![Cell::new("Overall band"), Cell::new(evaluation.band)]);
    table
}
