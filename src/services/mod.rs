mod answerer;
mod batch;
mod chunker;
mod decomposer;
mod embedding;
mod index;
mod llm;
mod metadata;
mod metrics;
#[cfg(test)]
pub(crate) mod testing;
mod vector_store;

use std::sync::Arc;

pub use answerer::{Answer, Answerer, ZERO_K_DEFAULT};
pub use batch::{BatchProcessor, BatchReport, IngestStats};
pub use chunker::{RecordChunker, RecordChunks, render_metadata};
pub use decomposer::{
    DECOMPOSITION_FORMAT, DecomposedQuery, FALLBACK_K, QueryDecomposer, material_filter,
    parse_decomposition,
};
pub use embedding::{Embedder, EmbeddingClient};
pub use index::DocumentIndex;
pub use llm::{LanguageModel, OllamaClient};
pub use metadata::extract_metadata;
pub use metrics::{MetricsStore, MetricsSummary, Operation};
pub use vector_store::{CollectionInfo, QdrantBackend, VectorStore, create_backend};

use crate::error::{EmbeddingError, IndexError, LlmError};
use crate::models::Config;

pub fn build_embedder(config: &Config) -> Result<Arc<dyn Embedder>, EmbeddingError> {
    Ok(Arc::new(EmbeddingClient::new(&config.embedding)?))
}

/// Build the document index (embedder plus vector store) once at startup.
pub fn build_index(config: &Config) -> Result<DocumentIndex, IndexError> {
    let embedder = build_embedder(config)?;
    let store = create_backend(&config.vector_store, embedder.dimension())?;
    Ok(DocumentIndex::new(embedder, store))
}

pub fn build_language_model(config: &Config) -> Result<Arc<dyn LanguageModel>, LlmError> {
    Ok(Arc::new(OllamaClient::new(&config.llm)?))
}
