//! Vector store abstraction layer.
//!
//! Qdrant is the store of record. The in-memory backend only exists for tests.

#[cfg(test)]
mod memory;
mod qdrant;

#[cfg(test)]
pub use memory::MemoryBackend;
pub use qdrant::QdrantBackend;

use async_trait::async_trait;

use crate::error::VectorStoreError;
use crate::models::{IndexedDocument, MetadataFilter, ScoredDocument, VectorStoreConfig};

/// Collection information
#[derive(Debug, Clone)]
pub struct CollectionInfo {
    pub points_count: u64,
}

/// Operations every vector store backend provides.
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn health_check(&self) -> Result<bool, VectorStoreError>;

    /// Returns None if the collection doesn't exist.
    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError>;

    /// Create the collection if it doesn't exist.
    async fn ensure_collection(&self) -> Result<(), VectorStoreError>;

    /// Insert or replace one document keyed by its `doc_id`.
    async fn upsert(&self, document: IndexedDocument) -> Result<(), VectorStoreError>;

    /// Nearest neighbours of `vector`, best first. With a filter, only
    /// documents whose metadata field equals the filter value are eligible.
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError>;

    /// Remove every document and recreate the empty collection.
    async fn clear(&self) -> Result<(), VectorStoreError>;

    fn collection(&self) -> &str;
}

/// Create a vector store backend for the given embedding dimension.
pub fn create_backend(
    config: &VectorStoreConfig,
    dimension: usize,
) -> Result<Box<dyn VectorStore>, VectorStoreError> {
    Ok(Box::new(QdrantBackend::new(config, dimension as u64)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_backend_uses_configured_collection() {
        let config = VectorStoreConfig {
            collection: "materials".to_string(),
            ..Default::default()
        };
        let backend = create_backend(&config, 8).unwrap();
        assert_eq!(backend.collection(), "materials");
    }

    #[test]
    fn test_create_qdrant_backend_is_lazy() {
        // Building the client does not open a connection
        let backend = create_backend(&VectorStoreConfig::default(), 768).unwrap();
        assert_eq!(backend.collection(), "chatbot_data");
    }
}
