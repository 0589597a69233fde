//! Evaluation and audit prompt construction.
//!
//! The provider is asked to answer in a fixed line format so that
//! [`crate::parser::parse_evaluation`] can read it back. Review audits ask
//! for a JSON object read by [`crate::audit::parse_review_audit`].

use crate::audit::AuditRequest;
use crate::model::{Criterion, EssayType};
use crate::parser::RATIONALE_MARKER;
use crate::traits::EvaluationRequest;

const REPORT_DESCRIPTORS: &str = "\
[Task 1 Band Descriptors]

TA (Task Achievement):
9: Full data coverage + precise trend analysis
7: Key features identified with minor omissions
5: Missing significant data points
3: Serious misinterpretation

CC (Coherence & Cohesion):
9: Seamless paragraph transitions
7: Logical but mechanical linking
5: Disjointed progression
3: No paragraphing

LR (Lexical Resource):
9: Precise data verbs (plummet/surge)
7: Appropriate academic vocabulary
5: Basic terms repetition
3: Template-dependent

GRA (Grammatical Range):
9: Error-free comparative structures
7: Compound sentences with minor errors
5: Simple sentences dominate
3: Fragmented syntax";

const ARGUMENT_DESCRIPTORS: &str = "\
[Task 2 Band Descriptors]

TR (Task Response):
9: Nuanced arguments + solid evidence
7: Clear position with thin support
5: Vague stance + weak examples
3: Off-topic

CC (Coherence & Cohesion):
9: Natural transitions + referencing
7: Formulaic but functional links
5: Choppy connections
3: No structure

LR (Lexical Resource):
9: Sophisticated academic phrases
7: Correct terminology with slips
5: Limited vocabulary
3: Frequent spelling errors

GRA (Grammatical Range):
9: Masterful complex structures
7: Controlled compound sentences
5: Persistent basic errors
3: No clause control";

/// Band descriptors for an essay type.
pub fn band_descriptors(essay_type: EssayType) -> &'static str {
    match essay_type {
        EssayType::Report => REPORT_DESCRIPTORS,
        EssayType::Argument => ARGUMENT_DESCRIPTORS,
    }
}

/// Examiner instructions plus the band descriptors for the essay type.
pub fn system_prompt(essay_type: EssayType) -> String {
    format!(
        "Act as an official IELTS examiner. Follow these rules:
1. Scoring Criteria ({label}):
{descriptors}
2. Evaluation Requirements:
   - Provide constructive feedback using integer scores (1-9) for each criterion
   - Deliver evaluations in polished academic English
   - For every criterion:
    Begin with 1-2 positive observations
    Then highlight 2 specific, actionable improvements
   - Rigorously align with official band descriptors",
        label = essay_type.task_label(),
        descriptors = band_descriptors(essay_type),
    )
}

/// The essay plus the exact output format the parser expects.
pub fn user_prompt(request: &EvaluationRequest) -> String {
    let note = match request.essay_type {
        EssayType::Report => "(Chart Essay)",
        EssayType::Argument => "(Argumentative Essay)",
    };
    let chart = request
        .chart_description
        .as_deref()
        .map(|c| format!("\nChart Data Description: {c}"))
        .unwrap_or_default();
    let title = request.title.as_deref().unwrap_or_default();

    let mut format_lines = vec![format!(
        "{}: [score]",
        request.essay_type.task_criterion().marker()
    )];
    for criterion in [Criterion::Coherence, Criterion::Lexical, Criterion::Grammar] {
        format_lines.push(format!("{}: [score]", criterion.marker()));
    }

    format!(
        "Evaluate this IELTS essay {note}:
Title: {title}
{chart}
Essay Content:
{essay}

Output Format:
{format}
{RATIONALE_MARKER} [Provide specific suggestions in academic English]",
        essay = request.essay,
        format = format_lines.join("\n"),
    )
}

/// Instructions for auditing a peer review against the reference evaluation.
pub const AUDITOR_PROMPT: &str = r#"You are an academic evaluation auditor. Your task is to detect if USER REVIEWS are fake/misleading by comparing with AI's reference evaluation. Follow these steps:

1. Compare score discrepancies in all dimensions:
   - Significant deviations (e.g., user=9 vs AI=5)
   - Illogical combinations (high score with negative comments)

2. Analyze comment authenticity:
   - Generic/vague language (e.g., "great work")
   - Contradictions with scores
   - Lack of specific examples

3. Final judgment must be based on:
   - AI evaluation is the ground truth
   - User review is suspicious if it significantly deviates from AI's assessment

Return JSON format:
{
    "is_fake": boolean,
    "confidence": 0-100,
    "evaluation": "Key discrepancy found: [specific reason]"
}"#;

/// The essay, the reference evaluation and the review under scrutiny.
pub fn audit_user_prompt(request: &AuditRequest) -> String {
    format!(
        "Article Content:
{essay}

[AI Reference Evaluation]
Scores: {reference_scores}
Comments: {reference_comments}

[User Evaluation Under Scrutiny]
Scores: {review_scores}
Comments: {review_comments}",
        essay = request.essay,
        reference_scores = request.reference_scores(),
        reference_comments = request.reference.evaluation,
        review_scores = request.review.scores,
        review_comments = request.review.comments,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_prompt_asks_for_task_achievement() {
        let mut request = EvaluationRequest::new("The chart shows...", EssayType::Report);
        request.chart_description = Some("Sales by region, 2010-2020".into());
        request.title = Some("Regional sales".into());

        let prompt = user_prompt(&request);
        assert!(prompt.contains("(Chart Essay)"));
        assert!(prompt.contains("Chart Data Description: Sales by region"));
        assert!(prompt.contains("TA: [score]\nCC: [score]\nLR: [score]\nGRA: [score]"));
        assert!(prompt.contains("Evaluation: [Provide"));
        assert!(!prompt.contains("TR: [score]"));
    }

    #[test]
    fn argument_prompt_asks_for_task_response() {
        let request = EvaluationRequest::new("Some people believe...", EssayType::Argument);
        let prompt = user_prompt(&request);
        assert!(prompt.contains("TR: [score]"));
        assert!(!prompt.contains("Chart Data Description"));
    }

    #[test]
    fn system_prompt_carries_descriptors() {
        let system = system_prompt(EssayType::Report);
        assert!(system.contains("Task 1"));
        assert!(system.contains("TA (Task Achievement)"));

        let system = system_prompt(EssayType::Argument);
        assert!(system.contains("TR (Task Response)"));
    }

    #[test]
    fn audit_prompt_sets_reference_against_review() {
        use crate::audit::PeerReview;
        use crate::model::{Evaluation, StructuredScore, TaskScore};

        let request = AuditRequest {
            essay: "The chart shows...".into(),
            reference: Evaluation {
                scores: StructuredScore {
                    coherence: 6,
                    lexical: 6,
                    grammar: 5,
                    task: TaskScore::Achievement(6),
                },
                evaluation: "Overview missing.".into(),
                band: 6.0,
            },
            review: PeerReview {
                reviewer: "cai".into(),
                submission: 8,
                scores: serde_json::json!({"TA": 9}),
                comments: "perfect".into(),
            },
        };

        let prompt = audit_user_prompt(&request);
        assert!(prompt.starts_with("Article Content:\nThe chart shows..."));
        assert!(prompt.contains(r#"Scores: {"TA":6,"CC":6,"LR":6,"GRA":5,"band":6.0}"#));
        assert!(prompt.contains("Comments: Overview missing."));
        assert!(prompt.contains("[User Evaluation Under Scrutiny]\nScores: {\"TA\":9}\nComments: perfect"));
        assert!(request.system_prompt().contains("\"is_fake\": boolean"));
    }
}
