//! Database-backed embedding cache.
//!
//! Keyed by the SHA-256 of the text and the model name, so restarting the
//! bot does not re-embed documents that did not change.

use std::sync::Arc;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use super::embedder::EmbeddingProvider;
use crate::error::RetrievalError;
use crate::store::Database;

/// Hex SHA-256 of a text.
pub fn text_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Wraps a provider with a read-through cache in the database.
///
/// Cache errors are logged and the provider is used directly; they never
/// fail an embedding call.
pub struct CachedEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    db: Arc<dyn Database>,
}

impl CachedEmbedder {
    pub fn new(inner: Arc<dyn EmbeddingProvider>, db: Arc<dyn Database>) -> Self {
        Self { inner, db }
    }
}

#[async_trait]
impl EmbeddingProvider for CachedEmbedder {
    fn model_name(&self) -> &str {
        self.inner.model_name()
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = self.inner.model_name();
        let hashes: Vec<String> = texts.iter().map(|t| text_hash(t)).collect();

        let mut slots = match self.db.get_cached_embeddings(model, &hashes).await {
            Ok(found) if found.len() == texts.len() => found,
            Ok(_) => vec![None; texts.len()],
            Err(e) => {
                warn!(error = %e, "Embedding cache read failed, embedding everything");
                vec![None; texts.len()]
            }
        };

        let missing: Vec<usize> = slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_none())
            .map(|(i, _)| i)
            .collect();
        debug!(
            total = texts.len(),
            cached = texts.len() - missing.len(),
            "Embedding cache lookup"
        );

        if !missing.is_empty() {
            let to_embed: Vec<String> = missing.iter().map(|&i| texts[i].clone()).collect();
            let fresh = self.inner.embed(&to_embed).await?;
            if fresh.len() != to_embed.len() {
                return Err(RetrievalError::CountMismatch {
                    sent: to_embed.len(),
                    received: fresh.len(),
                });
            }

            let entries: Vec<(String, Vec<f32>)> = missing
                .iter()
                .zip(fresh.iter())
                .map(|(&i, v)| (hashes[i].clone(), v.clone()))
                .collect();
            if let Err(e) = self.db.put_cached_embeddings(model, &entries).await {
                warn!(error = %e, "Failed to cache embeddings");
            }

            for (&i, vector) in missing.iter().zip(fresh) {
                slots[i] = Some(vector);
            }
        }

        Ok(slots.into_iter().flatten().collect())
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, RetrievalError> {
        self.inner.embed_query(query).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::LibSqlBackend;

    /// Records every batch it is asked to embed.
    struct CountingEmbedder {
        calls: Mutex<Vec<Vec<String>>>,
    }

    #[async_trait]
    impl EmbeddingProvider for CountingEmbedder {
        fn model_name(&self) -> &str {
            "counting"
        }

        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RetrievalError> {
            self.calls.lock().unwrap().push(texts.to_vec());
            Ok(texts.iter().map(|t| vec![t.len() as f32]).collect())
        }
    }

    #[test]
    fn hash_is_stable_hex() {
        assert_eq!(
            text_hash("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[tokio::test]
    async fn second_call_is_served_from_cache() {
        let inner = Arc::new(CountingEmbedder {
            calls: Mutex::new(Vec::new()),
        });
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let cached = CachedEmbedder::new(inner.clone(), db);

        let first = cached
            .embed(&["one".to_string(), "three".to_string()])
            .await
            .unwrap();
        assert_eq!(first, vec![vec![3.0], vec![5.0]]);

        let second = cached
            .embed(&["three".to_string(), "four".to_string(), "one".to_string()])
            .await
            .unwrap();
        assert_eq!(second, vec![vec![5.0], vec![4.0], vec![3.0]]);

        let calls = inner.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1], vec!["four".to_string()]);
    }

    #[tokio::test]
    async fn fully_cached_batch_skips_provider() {
        let inner = Arc::new(CountingEmbedder {
            calls: Mutex::new(Vec::new()),
        });
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let cached = CachedEmbedder::new(inner.clone(), db);

        cached.embed(&["x".to_string()]).await.unwrap();
        cached.embed(&["x".to_string()]).await.unwrap();
        assert_eq!(inner.calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn queries_bypass_the_cache() {
        let inner = Arc::new(CountingEmbedder {
            calls: Mutex::new(Vec::new()),
        });
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        let cached = CachedEmbedder::new(inner.clone(), db.clone());

        assert_eq!(cached.embed_query("is oportun ok").await.unwrap(), vec![13.0]);
        assert_eq!(cached.embed_query("is oportun ok").await.unwrap(), vec![13.0]);

        assert_eq!(inner.calls.lock().unwrap().len(), 2);
        let stored = db
            .get_cached_embeddings("counting", &[text_hash("is oportun ok")])
            .await
            .unwrap();
        assert_eq!(stored, vec![None]);
    }
}
