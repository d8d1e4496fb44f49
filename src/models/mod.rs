mod chunk;
mod config;
mod conversation;
mod material;
mod search;

pub use chunk::Chunk;
pub use config::{
    Config, DEFAULT_COLLECTION, DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL,
    DEFAULT_LLM_MODEL, DEFAULT_QDRANT_URL, EmbeddingConfig, IngestConfig,
    LlmConfig, MetricsConfig, SearchConfig, SourceConfig, VectorStoreConfig,
};
pub use conversation::{Conversation, Role, Turn, render_transcript};
pub use material::{
    MagneticProperties, MaterialMetadata, MaterialRecord, NOT_AVAILABLE, Provenance, XasEdge,
    display_value,
};
pub use search::{
    IndexedDocument, MATERIAL_ID_FIELD, MetadataFilter, OutputFormat, ScoredDocument,
    SearchResults,
};
