//! The `assessly audit` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::{Deserialize, Serialize};

use assessly_core::audit::{PeerReview, ReviewAudit};
use assessly_core::model::{Evaluation, ReviewId, SubmissionId};
use assessly_core::parser::parse_evaluation;
use assessly_core::traits::SubmissionStore;

use super::Runtime;
use crate::OutputFormat;

/// A review file as written by the reviewer's client.
#[derive(Deserialize)]
struct ReviewFile {
    reviewer: String,
    scores: serde_json::Value,
    #[serde(default)]
    comments: String,
}

#[derive(Serialize)]
struct AuditOutput<'a> {
    review: ReviewId,
    submission: SubmissionId,
    reviewer: &'a str,
    audit: &'a ReviewAudit,
}

fn read(path: &Path, what: &str) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what}: {}", path.display()))
}

fn parse_reference(text: &str) -> Result<Evaluation> {
    Ok(Evaluation::from_parsed(parse_evaluation(text)?)?)
}

pub async fn execute(
    essay_path: PathBuf,
    reference_path: PathBuf,
    review_path: PathBuf,
    submission: SubmissionId,
    review_id: ReviewId,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let essay = read(&essay_path, "essay")?;
    let reference_text = read(&reference_path, "reference evaluation")?;
    let reference = parse_reference(&reference_text)
        .with_context(|| format!("invalid reference evaluation: {}", reference_path.display()))?;
    let review: ReviewFile = serde_json::from_str(&read(&review_path, "review")?)
        .with_context(|| format!("failed to parse review: {}", review_path.display()))?;
    let reviewer = review.reviewer.clone();

    let runtime = Runtime::from_config(config_path.as_deref())?;
    runtime.store.record_evaluation(submission, &reference).await?;

    let audit = runtime
        .coordinator
        .audit_review(
            review_id,
            essay.trim(),
            PeerReview {
                reviewer: review.reviewer,
                submission,
                scores: review.scores,
                comments: review.comments,
            },
        )
        .await?;

    match format {
        OutputFormat::Json => {
            let output = AuditOutput {
                review: review_id,
                submission,
                reviewer: &reviewer,
                audit: &audit,
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table.set_header(vec!["Review", "Reviewer", "Verdict", "Confidence"]);
            table.add_row(vec![
                Cell::new(review_id),
                Cell::new(&reviewer),
                Cell::new(if audit.is_fake { "suspicious" } else { "authentic" }),
                Cell::new(format!("{}%", audit.confidence)),
            ]);
            println!("{table}");
            if !audit.evaluation.is_empty() {
                println!("\n{}", audit.evaluation);
            }
        }
    }

    Ok(())
}
