//! The `assessly init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_once(Path::new("assessly.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("banks")?;
    write_once(Path::new("banks/example.toml"), EXAMPLE_BANK)?;
    write_once(Path::new("banks/example-answers.json"), EXAMPLE_ANSWERS)?;

    println!("\nNext steps:");
    println!("  1. Edit assessly.toml with your provider API key");
    println!("  2. Run: assessly validate --bank banks/example.toml");
    println!("  3. Run: assessly grade --bank banks/example.toml --answers banks/example-answers.json --evaluate");

    Ok(())
}

fn write_once(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# assessly configuration

# The mock provider returns a canned evaluation and needs no network access.
[provider]
type = "mock"

# An OpenAI-compatible endpoint. ASSESSLY_API_KEY overrides api_key.
# [provider]
# type = "openai"
# api_key = "${DEEPSEEK_API_KEY}"
# base_url = "https://api.deepseek.com"
# model = "deepseek-reasoner"
# temperature = 0.3
# top_p = 0.7

[coordinator]
result_ttl_secs = 3600
reap_interval_secs = 60
poll_timeout_secs = 30
retry_after_secs = 5
"#;

const EXAMPLE_BANK: &str = r#"[bank]
id = 1
name = "Example Mock Test"

[bank.essay]
task = 2
title = "Some people believe university education should be free. Discuss both views and give your opinion."

[[questions]]
number = 1
answer = "TRUE"
kind = "exact_match"

[[questions]]
number = 2
answer = "NOT GIVEN"
kind = "exact_match"

[[questions]]
number = 3
answer = "canal|canals"
kind = "exact_match"

[[questions]]
number = 4
answer = "BD"
kind = "paired_choice"

[[questions]]
number = 5
answer = "BD"
kind = "paired_choice"

[[questions]]
number = 6
kind = "free_text"
"#;

const EXAMPLE_ANSWERS: &str = r#"{
  "judgement": {"1": "TRUE", "2": "FALSE"},
  "blank": {"3": "canals"},
  "multiChoice": {"4": "DB", "5": "DB"},
  "write": {"6": "Whether university should be free is a contested question. On the one hand, ..."}
}
"#;
