//! Loads `.pdf` and `.txt` policy documents from a folder and chunks them.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use super::{Chunk, Chunker};
use crate::error::IngestError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DocumentKind {
    Pdf,
    Text,
}

impl DocumentKind {
    fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "pdf" => Some(Self::Pdf),
            "txt" => Some(Self::Text),
            _ => None,
        }
    }
}

/// Everything extracted from the documents folder.
#[derive(Debug, Clone, Default)]
pub struct LoadedDocuments {
    pub chunks: Vec<Chunk>,
    /// Chunk count per file, in filename order.
    pub per_file: BTreeMap<String, usize>,
    /// Files that could not be read or parsed.
    pub failed: Vec<String>,
}

impl LoadedDocuments {
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }
}

/// Reads a documents folder (non-recursive) in filename order.
pub struct DocumentLoader {
    dir: PathBuf,
    chunker: Chunker,
}

impl DocumentLoader {
    pub fn new(dir: impl Into<PathBuf>, chunker: Chunker) -> Self {
        Self {
            dir: dir.into(),
            chunker,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Load and chunk every supported file. A file that fails is logged and
    /// skipped; only an unreadable folder is an error.
    pub async fn load(&self) -> Result<LoadedDocuments, IngestError> {
        info!(dir = %self.dir.display(), "Loading and chunking documents");

        let mut files = self.list_files().await?;
        files.sort();

        let mut loaded = LoadedDocuments::default();
        for (name, path, kind) in files
            .into_iter()
            .filter_map(|(name, path)| DocumentKind::from_path(&path).map(|k| (name, path, k)))
        {
            match read_text(&name, &path, kind).await {
                Ok(text) => {
                    if text.trim().is_empty() {
                        warn!(file = %name, "No extractable text (scanned pages are not OCR'd)");
                    }
                    let chunks = self.chunker.chunk(&text, &name);
                    info!(file = %name, chunks = chunks.len(), "Extracted chunks");
                    loaded.per_file.insert(name, chunks.len());
                    loaded.chunks.extend(chunks);
                }
                Err(e) => {
                    warn!(file = %name, error = %e, "Skipping document");
                    loaded.failed.push(name);
                }
            }
        }

        info!(
            files = loaded.per_file.len(),
            chunks = loaded.chunks.len(),
            failed = loaded.failed.len(),
            "Documents loaded"
        );
        Ok(loaded)
    }

    async fn list_files(&self) -> Result<Vec<(String, PathBuf)>, IngestError> {
        let dir_err = |source| IngestError::DocumentsDir {
            path: self.dir.clone(),
            source,
        };

        let mut entries = tokio::fs::read_dir(&self.dir).await.map_err(dir_err)?;
        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(dir_err)? {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                files.push((name.to_string(), path.clone()));
            }
        }
        Ok(files)
    }
}

async fn read_text(name: &str, path: &Path, kind: DocumentKind) -> Result<String, IngestError> {
    match kind {
        DocumentKind::Text => {
            tokio::fs::read_to_string(path)
                .await
                .map_err(|source| IngestError::Read {
                    file: name.to_string(),
                    source,
                })
        }
        DocumentKind::Pdf => {
            let bytes = tokio::fs::read(path)
                .await
                .map_err(|source| IngestError::Read {
                    file: name.to_string(),
                    source,
                })?;
            let file = name.to_string();
            tokio::task::spawn_blocking(move || {
                pdf_extract::extract_text_from_mem(&bytes).map_err(|e| IngestError::Extraction {
                    file,
                    reason: format!("PDF extraction failed: {e}"),
                })
            })
            .await
            .map_err(|e| IngestError::Extraction {
                file: name.to_string(),
                reason: format!("PDF extraction task failed: {e}"),
            })?
        }
    }
}
