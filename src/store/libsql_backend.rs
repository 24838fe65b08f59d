//! `Database` over a single libSQL connection, file-backed or in memory.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::DatabaseError;
use crate::pipeline::types::AnswerRoute;
use crate::store::migrations;
use crate::store::traits::{Database, QuestionRecord};

/// libSQL database backend. The connection is shared by every task.
pub struct LibSqlBackend {
    // Dropping the database handle closes the connection.
    _db: libsql::Database,
    conn: Connection,
}

impl LibSqlBackend {
    /// Open (or create) the database file, creating its folder if needed.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| DatabaseError::Pool(format!("{}: {e}", parent.display())))?;
        }
        let backend = Self::open(path).await?;
        info!(path = %path.display(), "Database opened");
        Ok(backend)
    }

    /// Throwaway database for tests.
    pub async fn new_memory() -> Result<Self, DatabaseError> {
        Self::open(Path::new(":memory:")).await
    }

    async fn open(path: &Path) -> Result<Self, DatabaseError> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;
        let conn = db.connect().map_err(|e| DatabaseError::Pool(e.to_string()))?;
        let backend = Self { _db: db, conn };
        backend.run_migrations().await?;
        Ok(backend)
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Helper functions ────────────────────────────────────────────────

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_question(row: &libsql::Row) -> Result<QuestionRecord, libsql::Error> {
    let id_str: String = row.get(0)?;
    let route_str: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    Ok(QuestionRecord {
        id: Uuid::parse_str(&id_str).unwrap_or_else(|_| Uuid::nil()),
        channel: row.get(1)?,
        user_id: row.get(2).ok(),
        question: row.get(3)?,
        language: row.get(4)?,
        route: route_str.parse().unwrap_or(AnswerRoute::Retrieval),
        created_at: parse_datetime(&created_str),
    })
}

fn nullable(s: Option<String>) -> libsql::Value {
    s.map_or(libsql::Value::Null, libsql::Value::Text)
}

const QUESTION_COLUMNS: &str = "id, channel, user_id, question, language, route, created_at";

// ── Trait implementation ────────────────────────────────────────────

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        migrations::run_migrations(self.conn()).await
    }

    // ── Embedding cache ─────────────────────────────────────────────

    async fn get_cached_embeddings(
        &self,
        model: &str,
        hashes: &[String],
    ) -> Result<Vec<Option<Vec<f32>>>, DatabaseError> {
        let conn = self.conn();
        let mut found = Vec::with_capacity(hashes.len());

        for hash in hashes {
            let mut rows = conn
                .query(
                    "SELECT vector FROM embedding_cache WHERE text_hash = ?1 AND model = ?2",
                    params![hash.as_str(), model],
                )
                .await
                .map_err(|e| DatabaseError::Query(format!("get_cached_embeddings: {e}")))?;

            let vector = match rows.next().await {
                Ok(Some(row)) => {
                    let raw: String = row.get(0).map_err(|e| {
                        DatabaseError::Query(format!("get_cached_embeddings row parse: {e}"))
                    })?;
                    let vector: Vec<f32> = serde_json::from_str(&raw)
                        .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
                    Some(vector)
                }
                Ok(None) => None,
                Err(e) => return Err(DatabaseError::Query(format!("get_cached_embeddings: {e}"))),
            };
            found.push(vector);
        }

        debug!(
            requested = hashes.len(),
            hits = found.iter().filter(|v| v.is_some()).count(),
            "Embedding cache lookup"
        );
        Ok(found)
    }

    async fn put_cached_embeddings(
        &self,
        model: &str,
        entries: &[(String, Vec<f32>)],
    ) -> Result<(), DatabaseError> {
        let conn = self.conn();
        let now = Utc::now().to_rfc3339();

        for (hash, vector) in entries {
            let json = serde_json::to_string(vector)
                .map_err(|e| DatabaseError::Serialization(e.to_string()))?;
            conn.execute(
                "INSERT OR REPLACE INTO embedding_cache (text_hash, model, dimensions, vector, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![hash.as_str(), model, vector.len() as i64, json, now.as_str()],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("put_cached_embeddings: {e}")))?;
        }

        debug!(stored = entries.len(), model, "Embeddings cached");
        Ok(())
    }

    // ── Question log ────────────────────────────────────────────────

    async fn record_question(&self, record: &QuestionRecord) -> Result<(), DatabaseError> {
        self.conn()
            .execute(
                &format!("INSERT INTO questions ({QUESTION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"),
                params![
                    record.id.to_string(),
                    record.channel.as_str(),
                    nullable(record.user_id.clone()),
                    record.question.as_str(),
                    record.language.as_str(),
                    record.route.as_str(),
                    record.created_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("record_question: {e}")))?;

        debug!(id = %record.id, route = record.route.as_str(), "Question logged");
        Ok(())
    }

    async fn recent_questions(&self, limit: usize) -> Result<Vec<QuestionRecord>, DatabaseError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {QUESTION_COLUMNS} FROM questions ORDER BY created_at DESC, rowid DESC LIMIT ?1"
                ),
                params![limit as i64],
            )
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_questions: {e}")))?;

        let mut records = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| DatabaseError::Query(format!("recent_questions: {e}")))?
        {
            let record = row_to_question(&row)
                .map_err(|e| DatabaseError::Query(format!("recent_questions row parse: {e}")))?;
            records.push(record);
        }
        Ok(records)
    }

    async fn question_count(&self) -> Result<u64, DatabaseError> {
        let mut rows = self
            .conn()
            .query("SELECT COUNT(*) FROM questions", ())
            .await
            .map_err(|e| DatabaseError::Query(format!("question_count: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => Ok(row.get::<i64>(0).unwrap_or(0).max(0) as u64),
            Ok(None) => Ok(0),
            Err(e) => Err(DatabaseError::Query(format!("question_count: {e}"))),
        }
    }
}
