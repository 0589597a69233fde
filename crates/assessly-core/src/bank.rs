//! TOML question-bank loader.
//!
//! Loads answer keys from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::model::{AnswerKind, EssayPrompt, Question, QuestionBank};

/// Intermediate TOML structure for parsing bank files.
#[derive(Debug, Deserialize)]
struct TomlBankFile {
    bank: TomlBankHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlBankHeader {
    id: i64,
    name: String,
    #[serde(default)]
    essay: Option<TomlEssay>,
}

#[derive(Debug, Deserialize)]
struct TomlEssay {
    #[serde(default = "default_task")]
    task: u32,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    chart_description: Option<String>,
}

fn default_task() -> u32 {
    2
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    number: u32,
    #[serde(default)]
    answer: String,
    #[serde(default = "default_kind")]
    kind: AnswerKind,
}

fn default_kind() -> AnswerKind {
    AnswerKind::ExactMatch
}

/// Parse a single TOML file into a `QuestionBank`.
pub fn parse_bank(path: &Path) -> Result<QuestionBank> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bank file: {}", path.display()))?;

    parse_bank_str(&content, path)
}

/// Parse a TOML string into a `QuestionBank`.
pub fn parse_bank_str(content: &str, source_path: &Path) -> Result<QuestionBank> {
    let parsed: TomlBankFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let essay = parsed.bank.essay.map(|e| EssayPrompt {
        task: e.task,
        title: e.title,
        chart_description: e.chart_description,
    });

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            number: q.number,
            answer: q.answer,
            kind: q.kind,
        })
        .collect();

    Ok(QuestionBank {
        id: parsed.bank.id,
        name: parsed.bank.name,
        essay,
        questions,
    })
}

/// Recursively load all `.toml` bank files from a directory.
pub fn load_bank_directory(dir: &Path) -> Result<Vec<QuestionBank>> {
    let mut banks = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();

        if path.is_dir() {
            banks.extend(load_bank_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_bank(&path) {
                Ok(bank) => banks.push(bank),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    banks.sort_by_key(|b| b.id);
    Ok(banks)
}

/// A warning from bank validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationWarning {
    /// The question number (if applicable).
    pub question: Option<u32>,
    pub message: String,
}

impl ValidationWarning {
    fn question(number: u32, message: impl Into<String>) -> Self {
        Self {
            question: Some(number),
            message: message.into(),
        }
    }
}

/// Validate a bank for common answer-key mistakes.
pub fn validate_bank(bank: &QuestionBank) -> Vec<ValidationWarning> {
    let mut warnings = Vec::new();

    let mut seen = HashSet::new();
    for q in &bank.questions {
        if !seen.insert(q.number) {
            warnings.push(ValidationWarning::question(
                q.number,
                format!("duplicate question number: {}", q.number),
            ));
        }
    }

    for q in &bank.questions {
        match q.kind {
            AnswerKind::FreeText => {}
            _ if q.answer.trim().is_empty() => {
                warnings.push(ValidationWarning::question(q.number, "answer is empty"));
            }
            AnswerKind::PairedChoice => {
                let key = q.answer.trim();
                if key.chars().count() != 2 || !key.chars().all(|c| c.is_ascii_alphabetic()) {
                    warnings.push(ValidationWarning::question(
                        q.number,
                        format!("paired answer {key:?} is not exactly two letters"),
                    ));
                }
            }
            AnswerKind::ExactMatch => {}
        }
    }

    // Paired questions are graded two at a time in bank order.
    let mut run: Vec<u32> = Vec::new();
    for q in &bank.questions {
        if q.kind == AnswerKind::PairedChoice {
            run.push(q.number);
        } else {
            check_pair_run(&mut run, &mut warnings);
        }
    }
    check_pair_run(&mut run, &mut warnings);

    if bank.essay.is_none() && bank.questions.iter().any(|q| q.kind == AnswerKind::FreeText) {
        warnings.push(ValidationWarning {
            question: None,
            message: "bank has free-text questions but no [bank.essay] prompt".into(),
        });
    }

    warnings
}

fn check_pair_run(run: &mut Vec<u32>, warnings: &mut Vec<ValidationWarning>) {
    if run.len() % 2 == 1 {
        if let Some(&last) = run.last() {
            warnings.push(ValidationWarning::question(
                last,
                format!(
                    "paired group ending at question {last} has an odd number of questions ({})",
                    run.len()
                ),
            ));
        }
    }
    run.clear();
}
