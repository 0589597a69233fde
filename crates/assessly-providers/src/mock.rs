//! Mock provider for testing.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use assessly_core::audit::AuditRequest;
use assessly_core::traits::{EvaluationProvider, EvaluationRequest};

use crate::ProviderError;

enum Reply {
    /// Band 6 on every criterion, keyed for the request's essay type.
    Canned,
    Fixed(String),
    Fail(String),
}

/// A mock evaluation provider for exercising the coordinator without real
/// API calls.
pub struct MockProvider {
    reply: Reply,
    audit_reply: Option<String>,
    delay: Duration,
    call_count: AtomicU32,
    last_request: Mutex<Option<EvaluationRequest>>,
}

impl MockProvider {
    /// Create a mock that always returns the same evaluation text.
    pub fn with_fixed_response(response: &str) -> Self {
        Self {
            reply: Reply::Fixed(response.to_string()),
            ..Self::default()
        }
    }

    /// Answer review audits with a fixed verdict instead of the canned one.
    pub fn with_audit_response(mut self, response: &str) -> Self {
        self.audit_reply = Some(response.to_string());
        self
    }

    /// Create a mock whose every call fails with a network error.
    pub fn failing(message: &str) -> Self {
        Self {
            reply: Reply::Fail(message.to_string()),
            ..Self::default()
        }
    }

    /// Delay each response, to simulate a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Get the number of calls made to this provider.
    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::Relaxed)
    }

    /// Get the last request made to this provider.
    pub fn last_request(&self) -> Option<EvaluationRequest> {
        self.last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            reply: Reply::Canned,
            audit_reply: None,
            delay: Duration::ZERO,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }
}

#[async_trait]
impl EvaluationProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn evaluate(&self, request: &EvaluationRequest) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);
        *self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(request.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match &self.reply {
            Reply::Canned => Ok(format!(
                "{}: 6\nCC: 6\nLR: 6\nGRA: 6\nEvaluation: Mock evaluation. No provider was called.",
                request.essay_type.task_criterion().marker()
            )),
            Reply::Fixed(text) => Ok(text.clone()),
            Reply::Fail(message) => Err(ProviderError::NetworkError(message.clone()).into()),
        }
    }

    async fn audit_review(&self, _request: &AuditRequest) -> anyhow::Result<String> {
        self.call_count.fetch_add(1, Ordering::Relaxed);

        if let Reply::Fail(message) = &self.reply {
            return Err(ProviderError::NetworkError(message.clone()).into());
        }
        Ok(self.audit_reply.clone().unwrap_or_else(|| {
            r#"{"is_fake": false, "confidence": 50, "evaluation": "Mock audit. No provider was called."}"#
                .to_string()
        }))
    }
}
