//! Peer-review authenticity audit.
//!
//! A student's review of a submission is compared with the provider's
//! reference evaluation of the same essay. The provider answers with a JSON
//! verdict saying whether the review looks fake or careless.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::AuditError;
use crate::model::{Evaluation, SubmissionId};
use crate::prompt;

/// A student's review of someone else's submission.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerReview {
    pub reviewer: String,
    pub submission: SubmissionId,
    /// Per-criterion scores as entered by the reviewer.
    pub scores: Value,
    pub comments: String,
}

/// Everything the provider needs to audit one review.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRequest {
    /// The reviewed essay.
    pub essay: String,
    /// The provider's own evaluation of the essay, taken as ground truth.
    pub reference: Evaluation,
    pub review: PeerReview,
}

impl AuditRequest {
    pub fn system_prompt(&self) -> &'static str {
        prompt::AUDITOR_PROMPT
    }

    pub fn user_prompt(&self) -> String {
        prompt::audit_user_prompt(self)
    }

    /// The reference scores keyed by criterion marker, plus the band.
    pub fn reference_scores(&self) -> Value {
        let mut scores = Map::new();
        for (criterion, value) in self.reference.scores.entries() {
            scores.insert(criterion.marker().to_string(), Value::from(value));
        }
        scores.insert("band".to_string(), Value::from(self.reference.band));
        Value::Object(scores)
    }
}

/// The provider's verdict on a review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewAudit {
    pub is_fake: bool,
    /// 0-100.
    pub confidence: u8,
    /// The key discrepancy the verdict rests on.
    pub evaluation: String,
}

#[derive(Deserialize)]
struct RawAudit {
    is_fake: bool,
    confidence: f64,
    #[serde(default)]
    evaluation: String,
}

/// Parse the provider's JSON verdict.
///
/// Text around the outermost JSON object (markdown fences, a lead-in
/// sentence) is ignored. Fractional confidences are rounded.
pub fn parse_review_audit(text: &str) -> Result<ReviewAudit, AuditError> {
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err(AuditError::Malformed("no JSON object in response".into())),
    };

    let raw: RawAudit =
        serde_json::from_str(json).map_err(|e| AuditError::Malformed(e.to_string()))?;

    if !(0.0..=100.0).contains(&raw.confidence) {
        return Err(AuditError::ConfidenceOutOfRange(raw.confidence.to_string()));
    }

    Ok(ReviewAudit {
        is_fake: raw.is_fake,
        confidence: raw.confidence.round() as u8,
        evaluation: raw.evaluation.trim().to_string(),
    })
}
