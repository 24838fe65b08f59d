//! Shared types for the question answering pipeline.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::llm::language::Language;

/// Which branch of the dispatcher produced an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerRoute {
    /// Fixed bilingual answer from the creditor rule table.
    HardRule,
    /// Creditor on the global disqualification list.
    Disqualified,
    /// Retrieval found nothing usable.
    NoInformation,
    /// LLM answer grounded in retrieved document chunks.
    Retrieval,
}

impl AnswerRoute {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HardRule => "hard_rule",
            Self::Disqualified => "disqualified",
            Self::NoInformation => "no_information",
            Self::Retrieval => "retrieval",
        }
    }
}

impl fmt::Display for AnswerRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnswerRoute {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hard_rule" => Ok(Self::HardRule),
            "disqualified" => Ok(Self::Disqualified),
            "no_information" => Ok(Self::NoInformation),
            "retrieval" => Ok(Self::Retrieval),
            other => Err(format!("unknown answer route: {other}")),
        }
    }
}

/// A bilingual answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Answer {
    pub english: String,
    pub spanish: String,
    pub route: AnswerRoute,
    /// Source filenames of the chunks that backed a retrieval answer.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<String>,
}

impl Answer {
    pub fn new(english: impl Into<String>, spanish: impl Into<String>, route: AnswerRoute) -> Self {
        Self {
            english: english.into(),
            spanish: spanish.into(),
            route,
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<String>) -> Self {
        self.sources = sources;
        self
    }

    /// Chat-ready text with both language halves.
    pub fn render(&self) -> String {
        format!(
            "💬 *Answer (English):*\n{}\n\n💬 *Respuesta (Spanish):*\n{}",
            self.english, self.spanish
        )
    }
}

/// What `QuestionProcessor::respond` hands back to a channel.
#[derive(Debug, Clone)]
pub struct QuestionOutcome {
    pub answer: Answer,
    /// Language the question was asked in.
    pub language: Language,
    /// The question as dispatched (translated to English when needed).
    pub dispatched_question: String,
}

impl QuestionOutcome {
    pub fn text(&self) -> String {
        self.answer.render()
    }
}
