//! Provider configuration and factory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use assessly_core::coordinator::CoordinatorConfig;
use assessly_core::registry::RegistryConfig;
use assessly_core::traits::EvaluationProvider;

use crate::mock::MockProvider;
use crate::openai::{
    OpenAiProvider, DEFAULT_AUDIT_MODEL, DEFAULT_MODEL, DEFAULT_TEMPERATURE, DEFAULT_TOP_P,
};

/// Environment variable that overrides the provider API key.
pub const API_KEY_ENV: &str = "ASSESSLY_API_KEY";

/// Configuration for the evaluation provider.
///
/// Note: Custom Debug impl masks API keys to prevent accidental exposure in logs.
#[derive(Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        api_key: String,
        #[serde(default)]
        base_url: Option<String>,
        #[serde(default = "default_model")]
        model: String,
        #[serde(default = "default_temperature")]
        temperature: f64,
        #[serde(default = "default_top_p")]
        top_p: f64,
        /// Model used for peer-review audits.
        #[serde(default = "default_audit_model")]
        audit_model: String,
    },
    Mock {
        /// Fixed evaluation text; a band-6 evaluation for the essay type
        /// when omitted.
        #[serde(default)]
        response: Option<String>,
    },
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderConfig::OpenAI {
                api_key: _,
                base_url,
                model,
                temperature,
                top_p,
                audit_model,
            } => f
                .debug_struct("OpenAI")
                .field("api_key", &"***")
                .field("base_url", base_url)
                .field("model", model)
                .field("temperature", temperature)
                .field("top_p", top_p)
                .field("audit_model", audit_model)
                .finish(),
            ProviderConfig::Mock { response } => f
                .debug_struct("Mock")
                .field("response", response)
                .finish(),
        }
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Mock { response: None }
    }
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}
fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}
fn default_audit_model() -> String {
    DEFAULT_AUDIT_MODEL.to_string()
}

/// Timing settings for the job registry and the status poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoordinatorSettings {
    /// How long a finished job stays queryable.
    #[serde(default = "default_result_ttl")]
    pub result_ttl_secs: u64,
    /// Period of the reaper loop.
    #[serde(default = "default_reap_interval")]
    pub reap_interval_secs: u64,
    /// Upper bound on a single status poll.
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,
    /// Retry hint handed to pollers of unfinished jobs.
    #[serde(default = "default_retry_after")]
    pub retry_after_secs: u64,
}

fn default_result_ttl() -> u64 {
    3600
}
fn default_reap_interval() -> u64 {
    60
}
fn default_poll_timeout() -> u64 {
    30
}
fn default_retry_after() -> u64 {
    5
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            result_ttl_secs: default_result_ttl(),
            reap_interval_secs: default_reap_interval(),
            poll_timeout_secs: default_poll_timeout(),
            retry_after_secs: default_retry_after(),
        }
    }
}

impl CoordinatorSettings {
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig {
            result_ttl: Duration::from_secs(self.result_ttl_secs),
            reap_interval: Duration::from_secs(self.reap_interval_secs.max(1)),
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            poll_timeout: Duration::from_secs(self.poll_timeout_secs),
            retry_after: Duration::from_secs(self.retry_after_secs),
        }
    }
}

/// Top-level assessly configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AssesslyConfig {
    #[serde(default)]
    pub provider: ProviderConfig,
    #[serde(default)]
    pub coordinator: CoordinatorSettings,
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

/// Resolve env vars in a provider config.
fn resolve_provider_config(config: &ProviderConfig) -> ProviderConfig {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            model,
            temperature,
            top_p,
            audit_model,
        } => ProviderConfig::OpenAI {
            api_key: resolve_env_vars(api_key),
            base_url: base_url.as_ref().map(|u| resolve_env_vars(u)),
            model: resolve_env_vars(model),
            temperature: *temperature,
            top_p: *top_p,
            audit_model: resolve_env_vars(audit_model),
        },
        ProviderConfig::Mock { response } => ProviderConfig::Mock {
            response: response.clone(),
        },
    }
}

/// Apply an API key override. A key on its own switches a mock or default
/// configuration over to the OpenAI-compatible provider.
fn apply_api_key(config: &mut AssesslyConfig, key: String) {
    match &mut config.provider {
        ProviderConfig::OpenAI { api_key, .. } => *api_key = key,
        ProviderConfig::Mock { .. } => {
            config.provider = ProviderConfig::OpenAI {
                api_key: key,
                base_url: None,
                model: default_model(),
                temperature: default_temperature(),
                top_p: default_top_p(),
                audit_model: default_audit_model(),
            };
        }
    }
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `assessly.toml` in the current directory
/// 2. `~/.config/assessly/config.toml`
///
/// Environment variable override: `ASSESSLY_API_KEY`.
pub fn load_config() -> Result<AssesslyConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<AssesslyConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("assessly.toml");
        if local.exists() {
            Some(local)
        } else {
            dirs_path()
                .map(|home| home.join("config.toml"))
                .filter(|global| global.exists())
        }
    };

    let mut config = match config_path {
        Some(path) => {
            tracing::debug!("loading config from {}", path.display());
            parse_config(&path)?
        }
        None => AssesslyConfig::default(),
    };

    if let Ok(key) = std::env::var(API_KEY_ENV) {
        if !key.is_empty() {
            apply_api_key(&mut config, key);
        }
    }

    config.provider = resolve_provider_config(&config.provider);
    Ok(config)
}

fn parse_config(path: &Path) -> Result<AssesslyConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config: {}", path.display()))?;
    toml::from_str::<AssesslyConfig>(&content)
        .with_context(|| format!("failed to parse config: {}", path.display()))
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("assessly"))
}

/// Create a provider instance from its configuration.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn EvaluationProvider>> {
    match config {
        ProviderConfig::OpenAI {
            api_key,
            base_url,
            model,
            temperature,
            top_p,
            audit_model,
        } => {
            if api_key.trim().is_empty() {
                anyhow::bail!("openai provider requires an api_key (or set {API_KEY_ENV})");
            }
            let provider = OpenAiProvider::new(api_key, base_url.clone())?
                .with_model(model.clone())
                .with_sampling(*temperature, *top_p)
                .with_audit_model(audit_model.clone());
            Ok(Box::new(provider))
        }
        ProviderConfig::Mock { response } => Ok(Box::new(match response {
            Some(text) => MockProvider::with_fixed_response(text),
            None => MockProvider::default(),
        })),
    }
}
