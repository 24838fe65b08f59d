//! Document ingestion: loading policy files and cutting them into chunks.

pub mod chunker;
pub mod loader;

pub use chunker::Chunker;
pub use loader::{DocumentLoader, LoadedDocuments};

use serde::{Deserialize, Serialize};

/// A paragraph-like unit of document text and the file it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
}

impl Chunk {
    pub fn new(text: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
