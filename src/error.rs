//! Error types for the materials chatbot.

use thiserror::Error;

/// Errors related to fetching material records.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("materials API request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("materials API returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("missing API key for {0}")]
    MissingApiKey(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("parse error: {0}")]
    ParseError(String),
}

/// Errors related to embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("failed to connect to embedding server: {0}")]
    ConnectionError(String),

    #[error("embedding server error: {0}")]
    ServerError(String),

    #[error("embedding request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("invalid embedding response: {0}")]
    InvalidResponse(String),

    #[error("embedding timeout")]
    Timeout,
}

/// Errors related to vector store operations.
#[derive(Debug, Error)]
pub enum VectorStoreError {
    #[error("failed to connect to vector store: {0}")]
    ConnectionError(String),

    #[error("collection error: {0}")]
    CollectionError(String),

    #[error("upsert error: {0}")]
    UpsertError(String),

    #[error("search error: {0}")]
    SearchError(String),

    #[error("delete error: {0}")]
    DeleteError(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Errors from the document index (embedding + vector store).
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("vector store error: {0}")]
    VectorStore(#[from] VectorStoreError),
}

/// Errors related to language model calls.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("language model request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("language model returned status {status}: {body}")]
    ServerError { status: u16, body: String },

    #[error("invalid language model response: {0}")]
    InvalidResponse(String),
}

/// Errors raised while turning a record into chunks.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("record rendered to empty text")]
    EmptyContent,
}

/// Errors related to an ingestion run.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("index error: {0}")]
    Index(#[from] IndexError),
}

/// Errors related to answering a question.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("language model error: {0}")]
    Llm(#[from] LlmError),

    #[error("retrieval error: {0}")]
    Index(#[from] IndexError),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}
