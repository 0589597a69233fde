//! OpenAI-compatible chat completions provider.
//!
//! Works against any endpoint that speaks the `/v1/chat/completions`
//! protocol. The defaults target DeepSeek: the reasoning model for essays,
//! the chat model in JSON mode for peer-review audits.

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use assessly_core::audit::AuditRequest;
use assessly_core::traits::{EvaluationProvider, EvaluationRequest};

use crate::ProviderError;

pub const DEFAULT_BASE_URL: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-reasoner";
pub const DEFAULT_TEMPERATURE: f64 = 0.3;
pub const DEFAULT_TOP_P: f64 = 0.7;
pub const DEFAULT_AUDIT_MODEL: &str = "deepseek-chat";
const AUDIT_TEMPERATURE: f64 = 0.2;
const AUDIT_TOP_P: f64 = 0.3;
const DEFAULT_TIMEOUT_SECS: u64 = 180;

/// OpenAI-compatible essay evaluator.
pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
    temperature: f64,
    top_p: f64,
    audit_model: String,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .context("failed to build HTTP client")?;

        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            audit_model: DEFAULT_AUDIT_MODEL.to_string(),
            client,
        })
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_sampling(mut self, temperature: f64, top_p: f64) -> Self {
        self.temperature = temperature;
        self.top_p = top_p;
        self
    }

    /// Model used for peer-review audits.
    pub fn with_audit_model(mut self, model: impl Into<String>) -> Self {
        self.audit_model = model.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one chat completion and return the first choice's content.
    async fn complete(&self, body: &ChatRequest<'_>) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(DEFAULT_TIMEOUT_SECS)
                } else {
                    ProviderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5)
                * 1000;
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry_after,
            }
            .into());
        }
        if status == 401 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::AuthenticationFailed(body).into());
        }
        if status == 404 {
            return Err(ProviderError::ModelNotFound(body.model.to_string()).into());
        }
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status,
                message: body,
            }
            .into());
        }

        let api_response: ChatResponse =
            response
                .json()
                .await
                .map_err(|e| ProviderError::ApiError {
                    status,
                    message: format!("failed to parse response: {e}"),
                })?;

        let content = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ProviderError::ApiError {
                status,
                message: "response contained no message content".into(),
            })?;
        Ok(content)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    top_p: f64,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl EvaluationProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    #[instrument(skip(self, request), fields(model = %self.model, essay_type = %request.essay_type))]
    async fn evaluate(&self, request: &EvaluationRequest) -> Result<String> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt(),
                },
            ],
            temperature: self.temperature,
            top_p: self.top_p,
            stream: false,
            response_format: None,
        };

        let content = self.complete(&body).await?;

        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            chars = content.len(),
            "evaluation received"
        );
        Ok(content)
    }

    #[instrument(skip(self, request), fields(model = %self.audit_model, submission = request.review.submission))]
    async fn audit_review(&self, request: &AuditRequest) -> Result<String> {
        let start = Instant::now();

        let body = ChatRequest {
            model: &self.audit_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt().to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt(),
                },
            ],
            temperature: AUDIT_TEMPERATURE,
            top_p: AUDIT_TOP_P,
            stream: false,
            response_format: Some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let content = self.complete(&body).await?;

        tracing::debug!(
            latency_ms = start.elapsed().as_millis() as u64,
            "audit verdict received"
        );
        Ok(content)
    }
}
