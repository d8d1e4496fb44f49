use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::material::MaterialMetadata;

/// A bounded window of a material's rendered text plus its metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Primary key in the vector store.
    pub doc_id: String,
    /// Shared by every chunk cut from the same record.
    pub document_id: String,
    pub chunk_id: String,
    pub content: String,
    pub chunk_index: u32,
    pub total_chunks: u32,
    /// Character offsets into the rendered record text.
    pub start_offset: u64,
    pub end_offset: u64,
    pub metadata: MaterialMetadata,
    pub ingested_at: String,
}

impl Chunk {
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Metadata stored alongside the embedding: the material metadata
    /// flattened together with the chunk identifiers.
    pub fn payload(&self) -> Map<String, Value> {
        let mut payload = self.metadata.to_payload();
        payload.insert("doc_id".to_string(), self.doc_id.clone().into());
        payload.insert("document_id".to_string(), self.document_id.clone().into());
        payload.insert("chunk_id".to_string(), self.chunk_id.clone().into());
        payload.insert("chunk_index".to_string(), self.chunk_index.into());
        payload.insert("total_chunks".to_string(), self.total_chunks.into());
        payload.insert("ingested_at".to_string(), self.ingested_at.clone().into());
        payload
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MaterialRecord;
    use crate::services::extract_metadata;
    use serde_json::json;

    #[test]
    fn test_generate_id_is_unique_uuid() {
        let id = Chunk::generate_id();
        assert_eq!(id.len(), 36);
        assert_eq!(id.chars().filter(|c| *c == '-').count(), 4);
        assert_ne!(id, Chunk::generate_id());
    }

    #[test]
    fn test_payload_contains_ids_and_metadata() {
        let record = MaterialRecord::new(json!({"material_id": "mp-149", "formula_pretty": "Si"}));
        let chunk = Chunk {
            doc_id: "doc".to_string(),
            document_id: "document".to_string(),
            chunk_id: "chunk".to_string(),
            content: "Formula: Si".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            start_offset: 0,
            end_offset: 11,
            metadata: extract_metadata(&record),
            ingested_at: "2024-01-01T00:00:00Z".to_string(),
        };

        let payload = chunk.payload();
        assert_eq!(payload["doc_id"], json!("doc"));
        assert_eq!(payload["document_id"], json!("document"));
        assert_eq!(payload["chunk_id"], json!("chunk"));
        assert_eq!(payload["material_id"], json!("mp-149"));
        assert_eq!(payload["formula"], json!("Si"));
        assert!(!payload.contains_key("content"));
    }
}
