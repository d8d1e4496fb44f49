//! Deterministic stand-in for the embedding server, shared by unit tests.

use async_trait::async_trait;

use super::embedding::Embedder;
use crate::error::EmbeddingError;

/// Offline embedder that hashes word tokens into a fixed number of buckets.
/// Deterministic, so identical texts always map to identical vectors.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '-')
            .filter(|t| !t.is_empty())
        {
            let hash = fnv1a(&token.to_lowercase());
            let bucket = (hash % self.dimension as u64) as usize;
            let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_documents(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.embed(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        "hashing"
    }

    async fn health_check(&self) -> Result<Option<String>, EmbeddingError> {
        Ok(Some("hashing".to_string()))
    }
}

fn fnv1a(text: &str) -> u64 {
    text.bytes().fold(0xcbf2_9ce4_8422_2325, |hash, byte| {
        (hash ^ u64::from(byte)).wrapping_mul(0x0100_0000_01b3)
    })
}

mod tests {
    use super::*;

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic() {
        let embedder = HashingEmbedder::new(64);
        let texts = vec!["Formula: Fe2O3".to_string(), "Formula: Fe2O3".to_string()];
        let vectors = embedder.embed_documents(texts).await.unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 64);
        assert_eq!(vectors[0], vectors[1]);

        let norm: f32 = vectors[0].iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn test_hashing_query_matches_document_vector() {
        let embedder = HashingEmbedder::new(32);
        let query = embedder.embed_query("band gap of mp-149").await.unwrap();
        assert_eq!(query, embedder.embed("band gap of mp-149"));
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed("   ").iter().all(|v| *v == 0.0));
    }
}
