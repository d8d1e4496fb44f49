//! Qdrant vector store backend implementation.

use async_trait::async_trait;
use qdrant_client::Qdrant;
use qdrant_client::qdrant::point_id::PointIdOptions;
use qdrant_client::qdrant::value::Kind;
use qdrant_client::qdrant::{
    Condition, CreateCollectionBuilder, Distance, Filter, ListValue, PointStruct,
    SearchPointsBuilder, Struct, UpsertPointsBuilder, Value as QdrantValue, VectorParamsBuilder,
};
use serde_json::{Map, Value};
use std::collections::HashMap;

use super::{CollectionInfo, VectorStore};
use crate::error::VectorStoreError;
use crate::models::{IndexedDocument, MetadataFilter, ScoredDocument, VectorStoreConfig};

/// Payload key holding the chunk text.
const CONTENT_KEY: &str = "content";

/// Qdrant vector store backend.
pub struct QdrantBackend {
    client: Qdrant,
    collection: String,
    dimension: u64,
}

impl QdrantBackend {
    pub fn new(config: &VectorStoreConfig, dimension: u64) -> Result<Self, VectorStoreError> {
        let mut builder = Qdrant::from_url(&config.url);

        if let Some(ref api_key) = config.api_key {
            builder = builder.api_key(api_key.clone());
        }

        let client = builder
            .build()
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            collection: config.collection.clone(),
            dimension,
        })
    }

    fn build_filter(filter: &MetadataFilter) -> Filter {
        Filter::must([Condition::matches(
            filter.field.clone(),
            filter.value.clone(),
        )])
    }
}

#[async_trait]
impl VectorStore for QdrantBackend {
    async fn health_check(&self) -> Result<bool, VectorStoreError> {
        self.client
            .health_check()
            .await
            .map(|_| true)
            .map_err(|e| VectorStoreError::ConnectionError(e.to_string()))
    }

    async fn collection_info(&self) -> Result<Option<CollectionInfo>, VectorStoreError> {
        match self.client.collection_info(&self.collection).await {
            Ok(info) => Ok(Some(CollectionInfo {
                points_count: info.result.map_or(0, |r| r.points_count.unwrap_or(0)),
            })),
            Err(e) => {
                let msg = e.to_string();
                if msg.contains("not found") || msg.contains("doesn't exist") {
                    Ok(None)
                } else {
                    Err(VectorStoreError::CollectionError(msg))
                }
            }
        }
    }

    async fn ensure_collection(&self) -> Result<(), VectorStoreError> {
        if self.collection_info().await?.is_some() {
            return Ok(());
        }

        let create_collection = CreateCollectionBuilder::new(&self.collection)
            .vectors_config(VectorParamsBuilder::new(self.dimension, Distance::Cosine));

        self.client
            .create_collection(create_collection)
            .await
            .map_err(|e| VectorStoreError::CollectionError(e.to_string()))?;

        Ok(())
    }

    async fn upsert(&self, document: IndexedDocument) -> Result<(), VectorStoreError> {
        if document.vector.len() as u64 != self.dimension {
            return Err(VectorStoreError::DimensionMismatch {
                expected: self.dimension as usize,
                actual: document.vector.len(),
            });
        }

        let mut payload: HashMap<String, QdrantValue> = document
            .metadata
            .into_iter()
            .map(|(key, value)| (key, to_qdrant_value(value)))
            .collect();
        payload.insert(CONTENT_KEY.to_string(), document.content.into());

        let point = PointStruct::new(document.doc_id, document.vector, payload);
        let upsert = UpsertPointsBuilder::new(&self.collection, vec![point]).wait(true);

        self.client
            .upsert_points(upsert)
            .await
            .map_err(|e| VectorStoreError::UpsertError(e.to_string()))?;

        Ok(())
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: u64,
        filter: Option<&MetadataFilter>,
    ) -> Result<Vec<ScoredDocument>, VectorStoreError> {
        let mut search_builder =
            SearchPointsBuilder::new(&self.collection, vector, limit).with_payload(true);

        if let Some(f) = filter {
            search_builder = search_builder.filter(Self::build_filter(f));
        }

        let results = self
            .client
            .search_points(search_builder)
            .await
            .map_err(|e| VectorStoreError::SearchError(e.to_string()))?;

        let documents = results
            .result
            .into_iter()
            .map(|point| {
                let mut metadata: Map<String, Value> = point
                    .payload
                    .into_iter()
                    .map(|(key, value)| (key, from_qdrant_value(value)))
                    .collect();

                let content = match metadata.remove(CONTENT_KEY) {
                    Some(Value::String(s)) => s,
                    _ => String::new(),
                };

                let doc_id = match point.id.and_then(|id| id.point_id_options) {
                    Some(PointIdOptions::Uuid(uuid)) => uuid,
                    Some(PointIdOptions::Num(num)) => num.to_string(),
                    None => String::new(),
                };

                ScoredDocument {
                    doc_id,
                    score: point.score,
                    content,
                    metadata,
                }
            })
            .collect();

        Ok(documents)
    }

    async fn clear(&self) -> Result<(), VectorStoreError> {
        if self.collection_info().await?.is_some() {
            self.client
                .delete_collection(&self.collection)
                .await
                .map_err(|e| VectorStoreError::DeleteError(e.to_string()))?;
        }

        self.ensure_collection().await
    }

    fn collection(&self) -> &str {
        &self.collection
    }
}

fn to_qdrant_value(value: Value) -> QdrantValue {
    let kind = match value {
        Value::Null => Kind::NullValue(0),
        Value::Bool(b) => Kind::BoolValue(b),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Kind::IntegerValue(i),
            None => Kind::DoubleValue(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => Kind::StringValue(s),
        Value::Array(items) => Kind::ListValue(ListValue {
            values: items.into_iter().map(to_qdrant_value).collect(),
        }),
        Value::Object(fields) => Kind::StructValue(Struct {
            fields: fields
                .into_iter()
                .map(|(key, value)| (key, to_qdrant_value(value)))
                .collect(),
        }),
    };
    QdrantValue { kind: Some(kind) }
}

fn from_qdrant_value(value: QdrantValue) -> Value {
    match value.kind {
        None | Some(Kind::NullValue(_)) => Value::Null,
        Some(Kind::BoolValue(b)) => Value::Bool(b),
        Some(Kind::IntegerValue(i)) => Value::from(i),
        Some(Kind::DoubleValue(d)) => serde_json::Number::from_f64(d)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Some(Kind::StringValue(s)) => Value::String(s),
        Some(Kind::ListValue(list)) => {
            Value::Array(list.values.into_iter().map(from_qdrant_value).collect())
        }
        Some(Kind::StructValue(s)) => Value::Object(
            s.fields
                .into_iter()
                .map(|(key, value)| (key, from_qdrant_value(value)))
                .collect(),
        ),
    }
}
