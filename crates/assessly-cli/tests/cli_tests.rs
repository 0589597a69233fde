//! CLI integration tests using assert_cmd.

use std::path::Path;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn assessly() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("assessly").unwrap();
    cmd.env_remove("ASSESSLY_API_KEY");
    cmd
}

/// A temp directory populated by `assessly init`.
fn initialised() -> TempDir {
    let dir = TempDir::new().unwrap();
    assessly()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success();
    dir
}

fn write(dir: &Path, name: &str, content: &str) -> std::path::PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn stdout_json(output: std::process::Output) -> serde_json::Value {
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    serde_json::from_slice(&output.stdout).unwrap()
}

#[test]
fn help_output() {
    assessly()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Coursework assessment"));
}

#[test]
fn version_output() {
    assessly()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("assessly"));
}

#[test]
fn init_creates_files() {
    let dir = TempDir::new().unwrap();

    assessly()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Created assessly.toml"))
        .stdout(predicate::str::contains("Created banks/example.toml"));

    assert!(dir.path().join("assessly.toml").exists());
    assert!(dir.path().join("banks/example.toml").exists());
    assert!(dir.path().join("banks/example-answers.json").exists());
}

#[test]
fn init_skips_existing() {
    let dir = initialised();

    assessly()
        .current_dir(dir.path())
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("already exists"));
}

#[test]
fn validate_example_bank() {
    let dir = initialised();

    assessly()
        .current_dir(dir.path())
        .args(["validate", "--bank", "banks"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Example Mock Test (6 questions)"))
        .stdout(predicate::str::contains("All banks valid"));
}

#[test]
fn validate_reports_warnings() {
    let dir = TempDir::new().unwrap();
    let bank = write(
        dir.path(),
        "broken.toml",
        r#"
[bank]
id = 2
name = "Broken"

[[questions]]
number = 1
answer = "ABC"
kind = "paired_choice"
"#,
    );

    assessly()
        .args(["validate", "--bank"])
        .arg(&bank)
        .assert()
        .success()
        .stdout(predicate::str::contains("[Q1] WARNING"))
        .stdout(predicate::str::contains("not exactly two letters"))
        .stdout(predicate::str::contains("2 warning(s) found"));
}

#[test]
fn validate_nonexistent_file() {
    assessly()
        .args(["validate", "--bank", "nonexistent.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error"));
}

#[test]
fn grade_example_submission() {
    let dir = initialised();

    assessly()
        .current_dir(dir.path())
        .args([
            "grade",
            "--bank",
            "banks/example.toml",
            "--answers",
            "banks/example-answers.json",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Score: 80.0% (4/5 correct)"))
        .stdout(predicate::str::contains("1 free-text answer(s) awaiting evaluation"));
}

#[test]
fn grade_and_evaluate_with_mock_provider() {
    let dir = initialised();

    let output = assessly()
        .current_dir(dir.path())
        .args([
            "grade",
            "--bank",
            "banks/example.toml",
            "--answers",
            "banks/example-answers.json",
            "--evaluate",
            "--submission",
            "42",
            "--format",
            "json",
            "--config",
            "assessly.toml",
        ])
        .output()
        .unwrap();

    let json = stdout_json(output);
    assert_eq!(json["submission"], 42);
    assert_eq!(json["grade"]["score"], 80.0);
    assert_eq!(json["summary"]["unanswered"], 1);
    assert_eq!(json["evaluation"]["band"], 6.0);
    assert_eq!(json["evaluation"]["scores"]["task_response"], 6);
    assert!(json["evaluation"]["scores"].get("task_achievement").is_none());
}

#[test]
fn grade_rejects_malformed_answers() {
    let dir = initialised();
    write(dir.path(), "bad.json", "[1, 2, 3]");

    assessly()
        .current_dir(dir.path())
        .args(["grade", "--bank", "banks/example.toml", "--answers", "bad.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}

#[test]
fn assign_is_reproducible_with_seed() {
    let run = || {
        let output = assessly()
            .args([
                "assign",
                "--cohort",
                "ana,ben,cai,dee,eli",
                "--reviews",
                "2",
                "--seed",
                "17",
                "--format",
                "json",
            ])
            .output()
            .unwrap();
        stdout_json(output)
    };

    let first = run();
    assert_eq!(first.as_array().unwrap().len(), 10);
    assert_eq!(first, run());
}

#[test]
fn assign_from_review_set() {
    assessly()
        .args([
            "assign",
            "--cohort",
            "ana,ben,cai,dee",
            "--review-set",
            "count: 3, anonymous: true",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("12 assignment(s): 4 student(s), 3 review(s) each"));
}

#[test]
fn assign_rejects_oversized_review_count() {
    assessly()
        .args(["assign", "--cohort", "ana,ben,cai", "--reviews", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid review count 3"));
}

#[test]
fn assign_rejects_single_student() {
    assessly()
        .args(["assign", "--cohort", "ana", "--reviews", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not enough students"));
}

#[test]
fn parse_from_stdin() {
    assessly()
        .arg("parse")
        .write_stdin("TR: 7\nCC: 6\nLR: 6\nGRA: 6\nEvaluation: Develop the second paragraph.")
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall band"))
        .stdout(predicate::str::contains("6.5"))
        .stdout(predicate::str::contains("Develop the second paragraph."));
}

#[test]
fn parse_without_task_score_fails() {
    assessly()
        .arg("parse")
        .write_stdin("CC: 6\nLR: 6\nGRA: 6")
        .assert()
        .failure()
        .stderr(predicate::str::contains("missing task score"));
}

#[test]
fn parse_out_of_range_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "raw.txt", "TA: 7\nCC: 6\nLR: 6");

    assessly()
        .args(["parse", "--input"])
        .arg(&input)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid score range"));
}

#[test]
fn evaluate_with_mock_provider() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "assessly.toml",
        "[provider]\ntype = \"mock\"\nresponse = \"TA: 7\\nCC: 7\\nLR: 8\\nGRA: 7\\nEvaluation: Accurate overview.\"\n",
    );
    let essay = write(dir.path(), "essay.txt", "The chart illustrates ...");

    assessly()
        .args(["evaluate", "--task", "1", "--essay"])
        .arg(&essay)
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout(predicate::str::contains("Overall band"))
        .stdout(predicate::str::contains("7.5"))
        .stdout(predicate::str::contains("Accurate overview."));
}

#[test]
fn evaluate_openai_without_key_fails() {
    let dir = TempDir::new().unwrap();
    let config = write(
        dir.path(),
        "assessly.toml",
        "[provider]\ntype = \"openai\"\napi_key = \"\"\n",
    );
    let essay = write(dir.path(), "essay.txt", "An essay.");

    assessly()
        .args(["evaluate", "--essay"])
        .arg(&essay)
        .arg("--config")
        .arg(&config)
        .assert()
        .failure()
        .stderr(predicate::str::contains("api_key"));
}

#[test]
fn audit_with_mock_provider() {
    let dir = TempDir::new().unwrap();
    let config = write(dir.path(), "assessly.toml", "[provider]\ntype = \"mock\"\n");
    let essay = write(dir.path(), "essay.txt", "Some people believe that ...");
    let reference = write(
        dir.path(),
        "reference.txt",
        "TR: 5\nCC: 5\nLR: 6\nGRA: 5\nEvaluation: Thin support.",
    );
    let review = write(
        dir.path(),
        "review.json",
        r#"{"reviewer": "ana", "scores": {"TR": 9, "CC": 9}, "comments": "great work"}"#,
    );

    let output = assessly()
        .args(["audit", "--format", "json", "--review-id", "4", "--essay"])
        .arg(&essay)
        .arg("--reference")
        .arg(&reference)
        .arg("--review")
        .arg(&review)
        .arg("--config")
        .arg(&config)
        .output()
        .unwrap();
    let json = stdout_json(output);
    assert_eq!(json["review"], 4);
    assert_eq!(json["reviewer"], "ana");
    assert_eq!(json["audit"]["is_fake"], false);
    assert_eq!(json["audit"]["confidence"], 50);
}

#[test]
fn audit_rejects_invalid_reference() {
    let dir = TempDir::new().unwrap();
    let essay = write(dir.path(), "essay.txt", "An essay.");
    let reference = write(dir.path(), "reference.txt", "CC: 5\nLR: 6");
    let review = write(
        dir.path(),
        "review.json",
        r#"{"reviewer": "ben", "scores": {}}"#,
    );

    assessly()
        .current_dir(dir.path())
        .args(["audit", "--essay"])
        .arg(&essay)
        .arg("--reference")
        .arg(&reference)
        .arg("--review")
        .arg(&review)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid reference evaluation"))
        .stderr(predicate::str::contains("missing task score"));
}
