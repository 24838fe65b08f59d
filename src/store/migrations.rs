//! Version-tracked database migrations for the libSQL backend.
//!
//! `_migrations` records every applied version; only newer ones run.

use libsql::Connection;

use crate::error::DatabaseError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "embedding_cache",
        sql: r#"
            CREATE TABLE IF NOT EXISTS embedding_cache (
                text_hash TEXT NOT NULL,
                model TEXT NOT NULL,
                dimensions INTEGER NOT NULL,
                vector TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                PRIMARY KEY (text_hash, model)
            );
        "#,
    },
    Migration {
        version: 2,
        name: "question_log",
        sql: r#"
            CREATE TABLE IF NOT EXISTS questions (
                id TEXT PRIMARY KEY,
                channel TEXT NOT NULL,
                user_id TEXT,
                question TEXT NOT NULL,
                language TEXT NOT NULL,
                route TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at);
            CREATE INDEX IF NOT EXISTS idx_questions_route ON questions(route);
        "#,
    },
];

fn migration_error(context: &'static str) -> impl Fn(libsql::Error) -> DatabaseError {
    move |e| DatabaseError::Migration(format!("{context}: {e}"))
}

/// Bring the schema up to the newest version. Safe to call on every start.
pub async fn run_migrations(conn: &Connection) -> Result<(), DatabaseError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(migration_error("create _migrations"))?;

    let applied = schema_version(conn).await?;
    let pending: Vec<&Migration> = MIGRATIONS.iter().filter(|m| m.version > applied).collect();
    if pending.is_empty() {
        tracing::debug!(version = applied, "Schema up to date");
        return Ok(());
    }

    for migration in pending {
        tracing::info!(version = migration.version, name = migration.name, "Applying migration");
        conn.execute_batch(migration.sql).await.map_err(|e| {
            DatabaseError::Migration(format!(
                "V{} ({}) failed: {e}",
                migration.version, migration.name
            ))
        })?;
        conn.execute(
            "INSERT OR IGNORE INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await
        .map_err(migration_error("record migration"))?;
    }

    tracing::info!(version = schema_version(conn).await?, "Database migrations complete");
    Ok(())
}

/// Highest applied version, 0 for a fresh database.
async fn schema_version(conn: &Connection) -> Result<i64, DatabaseError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(migration_error("query schema version"))?;
    match rows.next().await.map_err(migration_error("read schema version"))? {
        Some(row) => row.get::<i64>(0).map_err(migration_error("parse schema version")),
        None => Ok(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_conn() -> Connection {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .unwrap();
        db.connect().unwrap()
    }

    #[tokio::test]
    async fn migrations_create_all_tables() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        for table in &["_migrations", "embedding_cache", "questions"] {
            let mut rows = conn
                .query(
                    "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name=?1",
                    libsql::params![*table],
                )
                .await
                .unwrap();
            let row = rows.next().await.unwrap().unwrap();
            let count: i64 = row.get(0).unwrap();
            assert_eq!(count, 1, "Table '{}' should exist", table);
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();
        run_migrations(&conn).await.unwrap();

        assert_eq!(schema_version(&conn).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn upgrades_a_database_stuck_at_v1() {
        let conn = test_conn().await;
        conn.execute_batch(MIGRATIONS[0].sql).await.unwrap();
        conn.execute(
            "CREATE TABLE _migrations (version INTEGER PRIMARY KEY, name TEXT NOT NULL, applied_at TEXT NOT NULL DEFAULT (datetime('now')))",
            (),
        )
        .await
        .unwrap();
        conn.execute("INSERT INTO _migrations (version, name) VALUES (1, 'embedding_cache')", ())
            .await
            .unwrap();

        run_migrations(&conn).await.unwrap();
        assert_eq!(schema_version(&conn).await.unwrap(), 2);
        conn.execute(
            "INSERT INTO questions (id, channel, question, language, route, created_at) VALUES ('q', 'api', 'hi', 'english', 'retrieval', '2026-01-01T00:00:00Z')",
            (),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn version_tracking_records_names() {
        let conn = test_conn().await;
        run_migrations(&conn).await.unwrap();

        let mut rows = conn
            .query("SELECT version, name FROM _migrations ORDER BY version", ())
            .await
            .unwrap();
        let first = rows.next().await.unwrap().unwrap();
        assert_eq!(first.get::<i64>(0).unwrap(), 1);
        assert_eq!(first.get::<String>(1).unwrap(), "embedding_cache");

        let second = rows.next().await.unwrap().unwrap();
        assert_eq!(second.get::<i64>(0).unwrap(), 2);
        assert_eq!(second.get::<String>(1).unwrap(), "question_log");
        assert!(rows.next().await.unwrap().is_none());
    }
}
