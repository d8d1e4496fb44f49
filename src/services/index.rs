//! Embedding-backed document index over a vector store.

use std::sync::Arc;
use tracing::debug;

use crate::error::IndexError;
use crate::models::{Chunk, IndexedDocument, MetadataFilter, ScoredDocument};
use crate::services::embedding::Embedder;
use crate::services::vector_store::{CollectionInfo, VectorStore};

/// Pairs an embedder with a vector store so callers deal only in text.
pub struct DocumentIndex {
    embedder: Arc<dyn Embedder>,
    store: Box<dyn VectorStore>,
}

impl DocumentIndex {
    pub fn new(embedder: Arc<dyn Embedder>, store: Box<dyn VectorStore>) -> Self {
        Self { embedder, store }
    }

    pub fn embedder(&self) -> &dyn Embedder {
        self.embedder.as_ref()
    }

    pub fn store(&self) -> &dyn VectorStore {
        self.store.as_ref()
    }

    pub async fn ensure_ready(&self) -> Result<(), IndexError> {
        self.store.ensure_collection().await?;
        Ok(())
    }

    pub async fn collection_info(&self) -> Result<Option<CollectionInfo>, IndexError> {
        Ok(self.store.collection_info().await?)
    }

    /// Embed a chunk's content and store it under the chunk's `doc_id`.
    pub async fn upload(&self, chunk: &Chunk) -> Result<(), IndexError> {
        let vector = self.embedder.embed_query(&chunk.content).await?;

        self.store
            .upsert(IndexedDocument {
                doc_id: chunk.doc_id.clone(),
                content: chunk.content.clone(),
                metadata: chunk.payload(),
                vector,
            })
            .await?;

        debug!(doc_id = %chunk.doc_id, chunk_index = chunk.chunk_index, "uploaded chunk");
        Ok(())
    }

    /// The `k` stored documents most similar to `query`.
    pub async fn search(
        &self,
        query: &str,
        k: usize,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, IndexError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let vector = self.embedder.embed_query(query).await?;
        let results = self.store.search(vector, k as u64, filter).await?;

        debug!(
            k,
            filter = filter.map(ToString::to_string),
            hits = results.len(),
            "similarity search"
        );
        Ok(results)
    }

    pub async fn clear(&self) -> Result<(), IndexError> {
        self.store.clear().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialRecord;
    use crate::services::chunker::RecordChunker;
    use crate::services::testing::HashingEmbedder;
    use crate::services::vector_store::MemoryBackend;
    use serde_json::json;

    fn index() -> DocumentIndex {
        DocumentIndex::new(
            Arc::new(HashingEmbedder::new(64)),
            Box::new(MemoryBackend::new("test", 64)),
        )
    }

    fn chunks_for(material_id: &str, formula: &str) -> Vec<Chunk> {
        RecordChunker::with_defaults().chunk_record(
            &MaterialRecord::new(json!({"material_id": material_id, "formula_pretty": formula})),
            0,
        )
    }

    #[tokio::test]
    async fn test_upload_then_search_returns_content_and_metadata() {
        let index = index();
        for chunk in chunks_for("mp-149", "Si") {
            index.upload(&chunk).await.unwrap();
        }

        let results = index.search("Formula: Si", 3, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert!(results[0].content.contains("Formula: Si"));
        assert_eq!(results[0].material_id(), Some("mp-149"));
        assert_eq!(results[0].formula(), Some("Si"));
    }

    #[tokio::test]
    async fn test_search_respects_k_and_filter() {
        let index = index();
        for (id, formula) in [("mp-1", "Fe"), ("mp-2", "Co"), ("mp-3", "Ni")] {
            for chunk in chunks_for(id, formula) {
                index.upload(&chunk).await.unwrap();
            }
        }

        assert_eq!(index.search("metal", 2, None).await.unwrap().len(), 2);
        assert!(index.search("metal", 0, None).await.unwrap().is_empty());

        let filter = MetadataFilter::material_id("mp-2");
        let filtered = index.search("metal", 5, Some(&filter)).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].material_id(), Some("mp-2"));
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        assert!(index().search("anything", 5, None).await.unwrap().is_empty());
    }
}
