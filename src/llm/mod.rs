//! Chat model access.
//!
//! OpenAI (default) or Anthropic through rig-core; `RigAdapter` puts either
//! behind `LlmProvider`. `LanguageService` builds detection and translation
//! on top.

pub mod language;
pub mod provider;
mod rig_adapter;

pub use language::{Language, LanguageService};
pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::str::FromStr;
use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Supported LLM backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmBackend {
    Anthropic,
    OpenAi,
}

impl FromStr for LlmBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "anthropic" => Ok(Self::Anthropic),
            other => Err(format!("unknown LLM backend '{other}' (expected openai or anthropic)")),
        }
    }
}

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub backend: LlmBackend,
    pub api_key: secrecy::SecretString,
    pub model: String,
}

impl LlmBackend {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Anthropic => "anthropic",
            Self::OpenAi => "openai",
        }
    }
}

/// Build the chat provider for one model.
///
/// Keys are not checked here; a bad key surfaces on the first request.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::{anthropic, openai};

    let key = config.api_key.expose_secret();
    let client_error = |e: &dyn std::fmt::Display| LlmError::RequestFailed {
        provider: config.backend.name().to_string(),
        reason: format!("client construction failed: {e}"),
    };

    let provider: Arc<dyn LlmProvider> = match config.backend {
        LlmBackend::Anthropic => {
            let client: rig::client::Client<anthropic::client::AnthropicExt> =
                anthropic::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(client.completion_model(&config.model), &config.model))
        }
        LlmBackend::OpenAi => {
            let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
                openai::Client::new(key).map_err(|e| client_error(&e))?;
            Arc::new(RigAdapter::new(client.completion_model(&config.model), &config.model))
        }
    };
    tracing::info!(backend = config.backend.name(), model = %config.model, "Chat provider ready");
    Ok(provider)
}
