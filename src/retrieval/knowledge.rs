//! The searchable document store: chunks plus their vector index.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use super::embedder::EmbeddingProvider;
use super::index::{FlatL2Index, VectorStore};
use crate::error::RetrievalError;
use crate::ingest::{Chunk, LoadedDocuments};

/// Finds the document chunks closest to a question.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn top_chunks(&self, question: &str, k: usize) -> Result<Vec<Chunk>, RetrievalError>;
}

pub struct KnowledgeBase {
    chunks: Vec<Chunk>,
    documents: BTreeMap<String, usize>,
    index: Box<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl KnowledgeBase {
    /// Embed every chunk and index it. An empty document set builds an
    /// empty knowledge base that answers every search with nothing.
    pub async fn build(
        documents: LoadedDocuments,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self, RetrievalError> {
        let LoadedDocuments {
            chunks, per_file, ..
        } = documents;

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = embedder.embed(&texts).await?;
        if vectors.len() != chunks.len() {
            return Err(RetrievalError::CountMismatch {
                sent: chunks.len(),
                received: vectors.len(),
            });
        }

        let mut index = FlatL2Index::new();
        index.add(vectors)?;
        info!(
            chunks = chunks.len(),
            dimension = index.dimension().unwrap_or(0),
            model = embedder.model_name(),
            "Vector index built"
        );

        Ok(Self {
            chunks,
            documents: per_file,
            index: Box::new(index),
            embedder,
        })
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Chunk count per source file.
    pub fn documents(&self) -> &BTreeMap<String, usize> {
        &self.documents
    }

    pub fn is_indexed(&self) -> bool {
        self.index.len() == self.chunks.len()
    }
}

#[async_trait]
impl Retriever for KnowledgeBase {
    async fn top_chunks(&self, question: &str, k: usize) -> Result<Vec<Chunk>, RetrievalError> {
        if self.index.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let query = self.embedder.embed_query(question).await?;

        let hits = self.index.search(&query, k)?;
        debug!(k, hits = hits.len(), "Retrieved chunks");
        Ok(hits
            .into_iter()
            .filter_map(|hit| self.chunks.get(hit.id).cloned())
            .collect())
    }
}
