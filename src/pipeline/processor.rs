//! Question processor: dispatches a question to a bilingual answer.
//!
//! Flow:
//! 1. Hard rule table (no LLM) → fixed answer in both languages
//! 2. Global disqualification list → fixed English, translated Spanish
//! 3. Retrieval → validity filter → grounded LLM answer, translated

use std::sync::Arc;

use tracing::{debug, info};

use crate::error::PipelineError;
use crate::llm::language::{Language, LanguageService};
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::pipeline::prompts::{
    ANSWER_SYSTEM_PROMPT, NO_INFORMATION_ENGLISH, build_context, build_user_prompt,
};
use crate::pipeline::rules::{DISQUALIFIED_ENGLISH, RuleBook, RuleDecision};
use crate::pipeline::types::{Answer, AnswerRoute, QuestionOutcome};
use crate::pipeline::validity::{is_valid_primary_chunk, source_footer};
use crate::retrieval::Retriever;

/// Chunks retrieved per question unless configured otherwise.
pub const DEFAULT_TOP_K: usize = 5;

pub struct QuestionProcessor {
    rules: RuleBook,
    llm: Arc<dyn LlmProvider>,
    language: LanguageService,
    temperature: f32,
    top_k: usize,
}

impl QuestionProcessor {
    pub fn new(
        rules: RuleBook,
        llm: Arc<dyn LlmProvider>,
        language: LanguageService,
        temperature: f32,
    ) -> Self {
        Self {
            rules,
            llm,
            language,
            temperature,
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn rules(&self) -> &RuleBook {
        &self.rules
    }

    /// Answer an English question.
    pub async fn answer(
        &self,
        question: &str,
        retriever: &dyn Retriever,
    ) -> Result<Answer, PipelineError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        let normalized = question.to_lowercase();

        match self.rules.evaluate(&normalized) {
            Some(RuleDecision::HardRule {
                key,
                condition,
                english,
                spanish,
            }) => {
                info!(key, condition = condition.label(), "Answered from hard rule");
                return Ok(Answer::new(english, spanish, AnswerRoute::HardRule));
            }
            Some(RuleDecision::Disqualified { keyword }) => {
                info!(keyword, "Answered from disqualification list");
                return self
                    .translated(DISQUALIFIED_ENGLISH, AnswerRoute::Disqualified)
                    .await;
            }
            None => {}
        }

        let retrieved = retriever.top_chunks(question, self.top_k).await?;
        let valid: Vec<_> = retrieved
            .into_iter()
            .filter(|chunk| is_valid_primary_chunk(&chunk.text, &chunk.source))
            .collect();
        debug!(valid = valid.len(), "Filtered retrieved chunks");

        if valid.is_empty() {
            info!("No usable chunks, answering without documents");
            return self
                .translated(NO_INFORMATION_ENGLISH, AnswerRoute::NoInformation)
                .await;
        }

        let context = build_context(&valid);
        let request = CompletionRequest::new(vec![
            ChatMessage::system(ANSWER_SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(&context, question)),
        ])
        .with_temperature(self.temperature);
        let response = self.llm.complete(request).await?;
        let english = response.content.trim().to_string();

        let spanish = self.language.translate(&english, &Language::Spanish).await?;

        let mut sources: Vec<String> = valid.iter().map(|c| c.source.clone()).collect();
        sources.sort();
        sources.dedup();
        let footer = source_footer(sources.iter().map(String::as_str));

        info!(
            chunks = valid.len(),
            sources = sources.len(),
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Answered from documents"
        );
        Ok(Answer::new(
            format!("{english}\n\n{footer}"),
            format!("{spanish}\n\n{footer}"),
            AnswerRoute::Retrieval,
        )
        .with_sources(sources))
    }

    /// Detect the question's language, bring Spanish questions into
    /// English, then answer.
    pub async fn respond(
        &self,
        question: &str,
        retriever: &dyn Retriever,
    ) -> Result<QuestionOutcome, PipelineError> {
        if question.trim().is_empty() {
            return Err(PipelineError::EmptyQuestion);
        }
        let language = self.language.detect_language(question).await?;
        let dispatched_question = if language == Language::Spanish {
            self.language.translate(question, &Language::English).await?
        } else {
            question.to_string()
        };

        let answer = self.answer(&dispatched_question, retriever).await?;
        Ok(QuestionOutcome {
            answer,
            language,
            dispatched_question,
        })
    }

    async fn translated(&self, english: &str, route: AnswerRoute) -> Result<Answer, PipelineError> {
        let spanish = self.language.translate(english, &Language::Spanish).await?;
        Ok(Answer::new(english, spanish, route))
    }
}
