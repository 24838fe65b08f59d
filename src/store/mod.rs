//! Persistence layer: libSQL-backed embedding cache and question log.

pub mod libsql_backend;
pub mod migrations;
pub mod traits;

pub use libsql_backend::LibSqlBackend;
pub use traits::{Database, QuestionRecord};
