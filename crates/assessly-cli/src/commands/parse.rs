//! The `assessly parse` command.

use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};

use assessly_core::model::Evaluation;
use assessly_core::parser::parse_evaluation;

use super::evaluation_table;
use crate::OutputFormat;

pub fn execute(input: Option<PathBuf>, format: OutputFormat) -> Result<()> {
    let text = match &input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read input: {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };

    let evaluation = Evaluation::from_parsed(parse_evaluation(&text)?)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&evaluation)?),
        OutputFormat::Table => {
            println!("{}", evaluation_table(&evaluation));
            if !evaluation.evaluation.is_empty() {
                println!("\n{}", evaluation.evaluation);
            }
        }
    }

    Ok(())
}
