//! `Database` trait: single async interface for all persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::AnswerRoute;

/// One answered question, as written to the audit log.
#[derive(Debug, Clone)]
pub struct QuestionRecord {
    pub id: Uuid,
    /// Where the question came from (`slack`, `api`, ...).
    pub channel: String,
    pub user_id: Option<String>,
    pub question: String,
    /// Detected language label, e.g. `english`.
    pub language: String,
    pub route: AnswerRoute,
    pub created_at: DateTime<Utc>,
}

impl QuestionRecord {
    pub fn new(
        channel: impl Into<String>,
        user_id: Option<String>,
        question: impl Into<String>,
        language: impl Into<String>,
        route: AnswerRoute,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            channel: channel.into(),
            user_id,
            question: question.into(),
            language: language.into(),
            route,
            created_at: Utc::now(),
        }
    }
}

/// Backend-agnostic database trait covering the embedding cache and the
/// question log.
#[async_trait]
pub trait Database: Send + Sync {
    /// Run all pending schema migrations.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;

    // ── Embedding cache ─────────────────────────────────────────────

    /// Look up cached vectors by text hash. The result has one slot per
    /// requested hash, `None` where nothing is cached.
    async fn get_cached_embeddings(
        &self,
        model: &str,
        hashes: &[String],
    ) -> Result<Vec<Option<Vec<f32>>>, DatabaseError>;

    /// Store vectors keyed by text hash. Existing entries are replaced.
    async fn put_cached_embeddings(
        &self,
        model: &str,
        entries: &[(String, Vec<f32>)],
    ) -> Result<(), DatabaseError>;

    // ── Question log ────────────────────────────────────────────────

    /// Append an answered question.
    async fn record_question(&self, record: &QuestionRecord) -> Result<(), DatabaseError>;

    /// Most recent questions, newest first.
    async fn recent_questions(&self, limit: usize) -> Result<Vec<QuestionRecord>, DatabaseError>;

    /// Total number of logged questions.
    async fn question_count(&self) -> Result<u64, DatabaseError>;
}
