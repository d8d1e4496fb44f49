//! In-memory vector store using brute-force cosine similarity.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{IndexedDocument, MetadataFilter, ScoredDocument};

/// Vector store held entirely in process memory. Contents are lost on exit.
#[derive(Clone)]
pub struct MemoryBackend {
    collection: String,
    dimension: usize,
    documents: Arc<RwLock<HashMap<String, IndexedDocument>>>,
}

impl MemoryBackend {
    pub fn new(collection: &str, dimension: usize) -> Self {
        Self {
            collection: collection.to_string(),
            dimension,
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }

    fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
        let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorStore for MemoryBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        Ok(true)
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        Ok(Some(CollectionInfo {
            points_count: self.len().await as u64,
        }))
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        Ok(())
    }

    async fn upsert(&self, document: IndexedDocument) -> Result<(), VectorStoreError> {
        if document.vector.len() != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension,
                actual: document.vector.len(),
            });
        }

        let mut documents = self.documents.write().await;
        debug!(doc_id = %document.doc_id, "upserting document");
        documents.insert(document.doc_id.clone(), document);
        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError> {
        let documents = self.documents.read().await;

        let mut scored: Vec<(f32, &IndexedDocument)> = documents
            .values()
            .filter(|doc| filter.is_none_or(|f| f.matches(&doc.metadata)))
            .map(|doc| (Self::cosine_similarity(&vector, &doc.vector), doc))
            .collect();

        // Ties broken by id so repeated searches are stable
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.1.doc_id.cmp(&b.1.doc_id))
        });

        Ok(scored
            .into_iter()
            .take(limit as usize)
            .map(|(score, doc)| ScoredDocument {
                doc_id: doc.doc_id.clone(),
                score,
                content: doc.content.clone(),
                metadata: doc.metadata.clone(),
            })
            .collect())
    }

    async fn clear(&self) -> Result<(), VectorStoreError> {
        self.documents.write().await.clear();
        Ok(())
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn document(id: &str, material_id: &str, vector: Vec<f32>) -> IndexedDocument {
        let mut metadata = serde_json::Map::new();
        metadata.insert("material_id".to_string(), json!(material_id));
        IndexedDocument {
            doc_id: id.to_string(),
            content: format!("Material ID: {material_id}"),
            metadata,
            vector,
        }
    }

    #[tokio::test]
    async fn test_search_ranks_by_similarity() {
        let store = MemoryBackend::new("test", 2);
        store.upsert(document("a", "mp-1", vec![1.0, 0.0])).await.unwrap();
        store.upsert(document("b", "mp-2", vec![0.0, 1.0])).await.unwrap();
        store.upsert(document("c", "mp-3", vec![0.7, 0.7])).await.unwrap();

        let results = store.search(vec![1.0, 0.1], 2, None).await.unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].doc_id, "a");
        assert_eq!(results[1].doc_id, "c");
        assert!(results[0].score >= results[1].score);
    }

    #[tokio::test]
    async fn test_filter_restricts_before_ranking() {
        let store = MemoryBackend::new("test", 2);
        store.upsert(document("a", "mp-1", vec![1.0, 0.0])).await.unwrap();
        store.upsert(document("b", "mp-2", vec![0.0, 1.0])).await.unwrap();
        store.upsert(document("c", "mp-2", vec![0.1, 0.9])).await.unwrap();

        let filter = MetadataFilter::material_id("mp-2");
        let results = store.search(vec![1.0, 0.0], 5, Some(&filter)).await.unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| r.material_id() == Some("mp-2")));

        let none = MetadataFilter::material_id("mp-404");
        assert!(store.search(vec![1.0, 0.0], 5, Some(&none)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let store = MemoryBackend::new("test", 2);
        store.upsert(document("a", "mp-1", vec![1.0, 0.0])).await.unwrap();
        store.upsert(document("a", "mp-9", vec![0.0, 1.0])).await.unwrap();

        assert_eq!(store.len().await, 1);
        let results = store.search(vec![0.0, 1.0], 1, None).await.unwrap();
        assert_eq!(results[0].material_id(), Some("mp-9"));
    }

    #[tokio::test]
    async fn test_dimension_mismatch_rejected() {
        let store = MemoryBackend::new("test", 3);
        let err = store.upsert(document("a", "mp-1", vec![1.0])).await.unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch { expected: 3, actual: 1 }
        ));
    }

    #[tokio::test]
    async fn test_clear_empties_store() {
        let store = MemoryBackend::new("test", 2);
        store.upsert(document("a", "mp-1", vec![1.0, 0.0])).await.unwrap();
        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert_eq!(store.collection_info().await.unwrap().unwrap().points_count, 0);
    }
}
