//! Search-related models for queries and results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata field holding the material identifier.
pub const MATERIAL_ID_FIELD: &str = "material_id";

/// Output format for command results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// Exact-match restriction on one metadata field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataFilter {
    pub field: String,
    pub value: String,
}

impl MetadataFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn material_id(id: impl Into<String>) -> Self {
        Self::new(MATERIAL_ID_FIELD, id)
    }

    pub fn matches(&self, metadata: &Map<String, Value>) -> bool {
        metadata
            .get(&self.field)
            .and_then(Value::as_str)
            .is_some_and(|v| v == self.value)
    }
}

impl std::fmt::Display for MetadataFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}={}", self.field, self.value)
    }
}

/// A chunk as persisted in the vector store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedDocument {
    pub doc_id: String,
    pub content: String,
    pub metadata: Map<String, Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub vector: Vec<f32>,
}

/// A stored document paired with its similarity to the query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredDocument {
    pub doc_id: String,
    /// Similarity score, higher is closer
    pub score: f32,
    pub content: String,
    pub metadata: Map<String, Value>,
}

impl ScoredDocument {
    pub fn material_id(&self) -> Option<&str> {
        self.metadata.get(MATERIAL_ID_FIELD).and_then(Value::as_str)
    }

    pub fn formula(&self) -> Option<&str> {
        self.metadata.get("formula").and_then(Value::as_str)
    }
}

/// Collection of search results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResults {
    /// Query that was executed
    pub query: String,

    /// Filter applied before ranking, if any
    pub filter: Option<MetadataFilter>,

    /// Matching results
    pub results: Vec<ScoredDocument>,

    /// Query execution time in milliseconds
    pub duration_ms: u64,
}

impl SearchResults {
    pub fn new(
        query: String,
        filter: Option<MetadataFilter>,
        results: Vec<ScoredDocument>,
        duration_ms: u64,
    ) -> Self {
        Self {
            query,
            filter,
            results,
            duration_ms,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }
}
