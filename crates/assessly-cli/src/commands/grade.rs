//! The `assessly grade` command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use serde::Serialize;

use assessly_core::bank::parse_bank;
use assessly_core::grading::{grade_submission, GradeReport};
use assessly_core::model::{Evaluation, SubmissionId, SubmittedAnswers};
use assessly_core::summary::PerformanceSummary;

use super::{evaluation_table, Runtime};
use crate::OutputFormat;

#[derive(Serialize)]
struct GradeOutput<'a> {
    submission: SubmissionId,
    grade: &'a GradeReport,
    summary: PerformanceSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    evaluation: Option<&'a Evaluation>,
}

pub async fn execute(
    bank_path: PathBuf,
    answers_path: PathBuf,
    evaluate: bool,
    submission: SubmissionId,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let bank = parse_bank(&bank_path)?;

    let raw = std::fs::read_to_string(&answers_path)
        .with_context(|| format!("failed to read answers: {}", answers_path.display()))?;
    let json: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse answers: {}", answers_path.display()))?;
    let answers = SubmittedAnswers::from_json(&json)?;

    let (grade, evaluation) = if evaluate {
        let runtime = Runtime::from_config(config_path.as_deref())?;
        runtime.store.insert_bank(bank.clone()).await;
        let outcome = runtime
            .coordinator
            .submit_for_bank(submission, bank.id, &answers)
            .await?;
        let evaluation = if outcome.evaluation_started {
            let evaluation = runtime.wait_for(submission).await?;
            if let Some(score) = runtime.store.score(submission).await {
                tracing::info!(submission, score, "submission score recorded");
            }
            Some(evaluation)
        } else {
            tracing::warn!("--evaluate given but the submission has no free-text answer");
            None
        };
        (outcome.grade, evaluation)
    } else {
        (grade_submission(&bank, &answers)?, None)
    };

    let summary = PerformanceSummary::from_answers(&grade.answers);

    match format {
        OutputFormat::Json => {
            let output = GradeOutput {
                submission,
                grade: &grade,
                summary,
                evaluation: evaluation.as_ref(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Table => {
            println!("Bank: {} ({} questions)", bank.name, bank.questions.len());
            println!("{}", answers_table(&grade));
            println!(
                "Score: {:.1}% ({}/{} correct)",
                grade.score, grade.correct, grade.considered
            );
            println!(
                "Summary: {} correct, {} incorrect, {} unanswered of {}",
                summary.correct, summary.incorrect, summary.unanswered, summary.total
            );
            if !grade.essays.is_empty() && evaluation.is_none() {
                println!(
                    "{} free-text answer(s) awaiting evaluation (rerun with --evaluate)",
                    grade.essays.len()
                );
            }
            if let Some(evaluation) = &evaluation {
                println!("\n{}", evaluation_table(evaluation));
                println!("\n{}", evaluation.evaluation);
            }
        }
    }

    Ok(())
}

fn answers_table(grade: &GradeReport) -> Table {
    let mut table = Table::new();
    table.set_header(vec!["Question", "Answer", "Key", "Outcome"]);
    for answer in &grade.answers {
        let user = answer.user_answer.as_deref().unwrap_or("-");
        let user = match user.char_indices().nth(40) {
            Some((cut, _)) => format!("{}...", &user[..cut]),
            None => user.to_string(),
        };
        table.add_row(vec![
            Cell::new(answer.question),
            Cell::new(user),
            Cell::new(&answer.correct_answer),
            Cell::new(answer.outcome),
        ]);
    }
    table
}
