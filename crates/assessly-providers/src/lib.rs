//! assessly-providers: essay evaluation provider integrations.
//!
//! Implements the `EvaluationProvider` trait for OpenAI-compatible chat
//! completion endpoints, plus a mock provider for tests, and loads the
//! provider and coordinator settings from TOML.

pub mod config;
pub mod mock;
pub mod openai;

pub use assessly_core::error::ProviderError;
pub use config::{create_provider, load_config, AssesslyConfig, CoordinatorSettings, ProviderConfig};
