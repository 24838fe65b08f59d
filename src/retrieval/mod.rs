//! Embeddings, vector search and the knowledge base built from them.

pub mod cache;
pub mod embedder;
pub mod index;
pub mod knowledge;

pub use cache::CachedEmbedder;
pub use embedder::{EmbeddingProvider, OpenAiEmbedder};
pub use index::{FlatL2Index, SearchHit, VectorStore};
pub use knowledge::{KnowledgeBase, Retriever};
