//! Error types for the policy bot, one enum per subsystem.

use std::path::PathBuf;
use std::time::Duration;

/// Anything that can stop startup or a background task.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Ingest error: {0}")]
    Ingest(#[from] IngestError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),
}

/// Environment parsing errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    MissingEnvVar(String),

    #[error("{key} has an invalid value: {message}")]
    InvalidValue { key: String, message: String },
}

/// libSQL errors. The payload is the driver's message.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("could not open database: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("schema migration failed: {0}")]
    Migration(String),

    #[error("bad stored value: {0}")]
    Serialization(String),
}

/// Chat platform errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    #[error("{name} could not start: {reason}")]
    StartupFailed { name: String, reason: String },

    #[error("{name} connection dropped: {reason}")]
    Disconnected { name: String, reason: String },

    #[error("{name} rejected the message: {reason}")]
    SendFailed { name: String, reason: String },

    #[error("{name} request not authenticated: {reason}")]
    AuthFailed { name: String, reason: String },

    #[error("HTTP transport: {0}")]
    Http(String),
}

/// Chat model errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} rate limited, retry after {retry_after:?}")]
    RateLimited {
        provider: String,
        retry_after: Option<Duration>,
    },

    #[error("Request has no user message to send")]
    EmptyPrompt,
}

/// Document loading and chunking errors.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Cannot read documents folder {path}: {source}")]
    DocumentsDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {file}: {source}")]
    Read {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Text extraction failed for {file}: {reason}")]
    Extraction { file: String, reason: String },
}

/// Embedding and vector search errors.
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("Embedding request failed: {reason}")]
    EmbeddingFailed { reason: String },

    #[error("Embedding provider rate limited")]
    RateLimited,

    #[error("Vector dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding count mismatch: sent {sent}, received {received}")]
    CountMismatch { sent: usize, received: usize },

    #[error("Embedding cache error: {0}")]
    Cache(#[from] DatabaseError),
}

/// Question-answering pipeline errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Knowledge base is not initialized yet")]
    NotReady,

    #[error("Empty question")]
    EmptyQuestion,

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),
}

/// Result type alias for the bot.
pub type Result<T> = std::result::Result<T, Error>;
