//! Configuration types.
//!
//! Everything is read from the environment (a `.env` file is loaded first by
//! the binary). Lookups go through a closure so tests never touch the real
//! process environment.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;
use crate::llm::{LlmBackend, LlmConfig};

pub const DEFAULT_ANSWER_MODEL: &str = "gpt-4";
pub const DEFAULT_DETECT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-ada-002";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Slack credentials. Every field is optional: without a bot token the bot
/// can still serve the HTTP API, without an app token Socket Mode is off.
#[derive(Debug, Clone, Default)]
pub struct SlackConfig {
    pub bot_token: Option<SecretString>,
    pub app_token: Option<SecretString>,
    pub signing_secret: Option<SecretString>,
}

/// LLM and embedding settings.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Chat backend for answers, translation and detection.
    pub backend: LlmBackend,
    /// Always needed: embeddings go to OpenAI whatever the chat backend.
    pub openai_api_key: SecretString,
    pub anthropic_api_key: Option<SecretString>,
    pub openai_base_url: String,
    /// Model used for answers and translations.
    pub answer_model: String,
    /// Cheaper model used for language detection.
    pub detect_model: String,
    pub embed_model: String,
    pub temperature: f32,
}

/// Retrieval and chunking settings.
#[derive(Debug, Clone)]
pub struct RetrievalConfig {
    pub documents_dir: PathBuf,
    pub top_k: usize,
    pub max_chunk_words: usize,
}

/// Full bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    pub slack: SlackConfig,
    pub models: ModelConfig,
    pub retrieval: RetrievalConfig,
    pub db_path: PathBuf,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
}

impl BotConfig {
    /// Build configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar("OPENAI_API_KEY".to_string()))?;

        let backend = match get("POLICY_BOT_LLM_BACKEND") {
            Some(raw) => raw.parse::<LlmBackend>().map_err(|message| ConfigError::InvalidValue {
                key: "POLICY_BOT_LLM_BACKEND".to_string(),
                message,
            })?,
            None => LlmBackend::OpenAi,
        };
        let anthropic_api_key = get("ANTHROPIC_API_KEY").map(SecretString::from);
        if backend == LlmBackend::Anthropic && anthropic_api_key.is_none() {
            return Err(ConfigError::MissingEnvVar("ANTHROPIC_API_KEY".to_string()));
        }

        let models = ModelConfig {
            backend,
            openai_api_key,
            anthropic_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            answer_model: get("POLICY_BOT_ANSWER_MODEL")
                .unwrap_or_else(|| DEFAULT_ANSWER_MODEL.to_string()),
            detect_model: get("POLICY_BOT_DETECT_MODEL")
                .unwrap_or_else(|| DEFAULT_DETECT_MODEL.to_string()),
            embed_model: get("POLICY_BOT_EMBED_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBED_MODEL.to_string()),
            temperature: parse_or("POLICY_BOT_TEMPERATURE", get("POLICY_BOT_TEMPERATURE"), 0.3)?,
        };

        let retrieval = RetrievalConfig {
            documents_dir: get("POLICY_BOT_DOCUMENTS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("documents")),
            top_k: parse_or("POLICY_BOT_TOP_K", get("POLICY_BOT_TOP_K"), 5)?,
            max_chunk_words: parse_or(
                "POLICY_BOT_MAX_CHUNK_WORDS",
                get("POLICY_BOT_MAX_CHUNK_WORDS"),
                120,
            )?,
        };

        if retrieval.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "POLICY_BOT_TOP_K".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let slack = SlackConfig {
            bot_token: get("SLACK_BOT_TOKEN").map(SecretString::from),
            app_token: get("SLACK_APP_TOKEN").map(SecretString::from),
            signing_secret: get("SLACK_SIGNING_SECRET").map(SecretString::from),
        };

        Ok(Self {
            slack,
            models,
            retrieval,
            db_path: get("POLICY_BOT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("./data/policy-bot.db")),
            port: parse_or("PORT", get("PORT"), 5000)?,
            log_dir: get("POLICY_BOT_LOG_DIR").map(PathBuf::from),
        })
    }

    /// Provider settings for one of the configured chat models.
    pub fn llm_config(&self, model: &str) -> LlmConfig {
        let api_key = match self.models.backend {
            LlmBackend::OpenAi => self.models.openai_api_key.clone(),
            LlmBackend::Anthropic => self
                .models
                .anthropic_api_key
                .clone()
                .unwrap_or_else(|| self.models.openai_api_key.clone()),
        };
        LlmConfig {
            backend: self.models.backend,
            api_key,
            model: model.to_string(),
        }
    }

    /// Address the HTTP server binds to.
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::from(([0, 0, 0, 0], self.port))
    }

    /// Which credentials are present, for the status endpoint.
    pub fn environment_report(&self) -> EnvironmentReport {
        EnvironmentReport {
            slack_bot_token: self.slack.bot_token.is_some(),
            slack_app_token: self.slack.app_token.is_some(),
            openai_api_key: true,
        }
    }
}

/// Presence flags for required credentials. Never carries the values.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentReport {
    pub slack_bot_token: bool,
    pub slack_app_token: bool,
    pub openai_api_key: bool,
}

fn parse_or<T>(key: &str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_api_key_set() {
        let config = BotConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(config.models.openai_api_key.expose_secret(), "sk-test");
        assert_eq!(config.models.backend, LlmBackend::OpenAi);
        assert_eq!(config.models.answer_model, "gpt-4");
        assert_eq!(config.models.detect_model, "gpt-3.5-turbo");
        assert_eq!(config.models.embed_model, "text-embedding-ada-002");
        assert!((config.models.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(config.retrieval.top_k, 5);
        assert_eq!(config.retrieval.max_chunk_words, 120);
        assert_eq!(config.retrieval.documents_dir, PathBuf::from("documents"));
        assert_eq!(config.port, 5000);
        assert!(config.slack.bot_token.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn missing_api_key_is_an_error() {
        let err = BotConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "OPENAI_API_KEY"));
    }

    #[test]
    fn blank_values_count_as_missing() {
        let err = BotConfig::from_lookup(lookup(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn invalid_port_is_reported_with_key() {
        let err = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PORT", "not-a-port"),
        ]))
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PORT"),
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn zero_top_k_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("POLICY_BOT_TOP_K", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn anthropic_backend_needs_its_key() {
        let err = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("POLICY_BOT_LLM_BACKEND", "anthropic"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "ANTHROPIC_API_KEY"));

        let config = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("POLICY_BOT_LLM_BACKEND", "anthropic"),
        ]))
        .unwrap();
        let llm = config.llm_config("claude-3-5-sonnet-latest");
        assert_eq!(llm.backend, LlmBackend::Anthropic);
        assert_eq!(llm.api_key.expose_secret(), "sk-ant");
    }

    #[test]
    fn unknown_backend_rejected() {
        let err = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("POLICY_BOT_LLM_BACKEND", "cohere"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "POLICY_BOT_LLM_BACKEND"));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let config = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("OPENAI_BASE_URL", "http://localhost:8080/v1/"),
        ]))
        .unwrap();
        assert_eq!(config.models.openai_base_url, "http://localhost:8080/v1");
    }

    #[test]
    fn environment_report_reflects_slack_tokens() {
        let config = BotConfig::from_lookup(lookup(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("SLACK_BOT_TOKEN", "xoxb-1"),
        ]))
        .unwrap();
        let report = config.environment_report();
        assert!(report.slack_bot_token);
        assert!(!report.slack_app_token);
        assert!(report.openai_api_key);
    }
}
