//! Question answering pipeline.
//!
//! Every question flows through:
//! 1. `LanguageService::detect_language()`, translating Spanish to English
//! 2. `RuleBook::evaluate()`, fast keyword matching (no LLM)
//! 3. `Retriever::top_chunks()` and the validity filter
//! 4. A grounded completion, translated back into Spanish

pub mod processor;
pub mod prompts;
pub mod rules;
pub mod types;
pub mod validity;

pub use processor::QuestionProcessor;
pub use rules::{RuleBook, RuleDecision};
pub use types::{Answer, AnswerRoute, QuestionOutcome};
