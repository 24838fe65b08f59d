//! Language detection and translation through the LLM.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::prompts::{detect_language_prompt, translate_prompt};

/// Language of a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Language {
    English,
    Spanish,
    /// Anything else, as the detector named it (lowercase).
    Other(String),
}

impl Language {
    /// Normalise a one-word detector reply such as `"Spanish."` or `"Español"`.
    pub fn from_reply(reply: &str) -> Self {
        let word = reply
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric())
            .to_lowercase();
        match word.as_str() {
            "english" | "inglés" | "ingles" => Self::English,
            "spanish" | "español" | "espanol" | "castellano" => Self::Spanish,
            _ => Self::Other(word),
        }
    }

    /// Lowercase name, also used as the translation target.
    pub fn label(&self) -> &str {
        match self {
            Self::English => "english",
            Self::Spanish => "spanish",
            Self::Other(name) => name,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Detects question language and translates answers.
pub struct LanguageService {
    detector: Arc<dyn LlmProvider>,
    translator: Arc<dyn LlmProvider>,
    temperature: f32,
}

impl LanguageService {
    /// `detector` answers the one-word language question, `translator`
    /// does the translations at `temperature`.
    pub fn new(
        detector: Arc<dyn LlmProvider>,
        translator: Arc<dyn LlmProvider>,
        temperature: f32,
    ) -> Self {
        Self {
            detector,
            translator,
            temperature,
        }
    }

    pub async fn detect_language(&self, text: &str) -> Result<Language, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(detect_language_prompt(text))]);
        let response = self.detector.complete(request).await?;
        let language = Language::from_reply(&response.content);
        debug!(language = %language, model = self.detector.model_name(), "Detected language");
        Ok(language)
    }

    pub async fn translate(&self, text: &str, target: &Language) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![ChatMessage::user(translate_prompt(
            text,
            target.label(),
        ))])
        .with_temperature(self.temperature);
        let response = self.translator.complete(request).await?;
        debug!(target = %target, chars = response.content.len(), "Translated text");
        Ok(response.content.trim().to_string())
    }
}
