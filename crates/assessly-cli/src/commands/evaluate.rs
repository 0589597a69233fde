//! The `assessly evaluate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use assessly_core::model::EssayType;
use assessly_core::traits::EvaluationRequest;

use super::{evaluation_table, Runtime};
use crate::OutputFormat;

const SUBMISSION: i64 = 1;

pub async fn execute(
    essay_path: PathBuf,
    task: String,
    title: Option<String>,
    chart: Option<String>,
    format: OutputFormat,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let essay = std::fs::read_to_string(&essay_path)
        .with_context(|| format!("failed to read essay: {}", essay_path.display()))?;
    if essay.trim().is_empty() {
        anyhow::bail!("essay is empty: {}", essay_path.display());
    }
    let essay_type: EssayType = task.parse().map_err(|e: String| anyhow::anyhow!(e))?;

    let request = EvaluationRequest {
        essay: essay.trim().to_string(),
        essay_type,
        title,
        chart_description: chart,
    };

    let runtime = Runtime::from_config(config_path.as_deref())?;
    runtime
        .coordinator
        .register_evaluation(SUBMISSION, request)?;
    let evaluation = runtime.wait_for(SUBMISSION).await?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        OutputFormat::Table => {
            println!("{}", evaluation_table(&evaluation));
            println!("\n{}", evaluation.evaluation);
        }
    }

    Ok(())
}
