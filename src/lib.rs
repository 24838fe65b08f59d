//! Policy Bot: bilingual answers to debt-relief policy questions over Slack.

pub mod channels;
pub mod codex;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod pipeline;
pub mod retrieval;
pub mod server;
pub mod state;
pub mod store;
