use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_MATERIALS_URL: &str = "https://api.materialsproject.org/materials/summary";
pub const DEFAULT_EMBEDDING_URL: &str = "http://localhost:8080";
pub const DEFAULT_EMBEDDING_MODEL: &str = "sentence-transformers/all-mpnet-base-v2";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
pub const DEFAULT_QDRANT_URL: &str = "http://localhost:6334";
pub const DEFAULT_COLLECTION: &str = "chatbot_data";
pub const DEFAULT_LLM_URL: &str = "http://localhost:11434";
pub const DEFAULT_LLM_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_METRICS_RETENTION_DAYS: u32 = 30;

const APP_DIR: &str = "matbot";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub vector_store: VectorStoreConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join(APP_DIR).join("config.toml"))
    }

    pub fn metrics_db_path() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join(APP_DIR).join("metrics.db"))
    }

    /// Load the user config file (defaults if absent), then apply
    /// environment overrides. Required values are not checked here.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.ingest.chunk_overlap >= self.ingest.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "ingest.chunk_overlap ({}) must be smaller than ingest.chunk_size ({})",
                self.ingest.chunk_overlap, self.ingest.chunk_size
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "ingest.batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Override values from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = non_empty("MATERIALS_PROJECT_API_KEY") {
            self.source.api_key = Some(v);
        }
        if let Some(v) = non_empty("MATERIALS_PROJECT_URL") {
            self.source.url = v;
        }
        if let Some(v) = non_empty("EMBEDDING_URL") {
            self.embedding.url = v;
        }
        if let Some(v) = non_empty("EMBEDDING_MODEL") {
            self.embedding.model = v;
        }
        if let Some(v) = non_empty("QDRANT_URL") {
            self.vector_store.url = v;
        }
        if let Some(v) = non_empty("QDRANT_API_KEY") {
            self.vector_store.api_key = Some(v);
        }
        if let Some(v) = non_empty("QDRANT_COLLECTION") {
            self.vector_store.collection = v;
        }
        if let Some(v) = non_empty("LLM_URL") {
            self.llm.url = v;
        }
        if let Some(v) = non_empty("LLM_MODEL") {
            self.llm.model = v;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(default = "default_materials_url")]
    pub url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Records requested per page (`_limit`)
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Upper bound on pages fetched per run
    #[serde(default = "default_max_pages")]
    pub max_pages: u32,
}

fn default_materials_url() -> String {
    DEFAULT_MATERIALS_URL.to_string()
}

fn default_page_size() -> u32 {
    1000
}

fn default_max_pages() -> u32 {
    1
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_materials_url(),
            api_key: None,
            page_size: default_page_size(),
            max_pages: default_max_pages(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_url")]
    pub url: String,

    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default = "default_embedding_dimension")]
    pub dimension: u32,

    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_embedding_url() -> String {
    DEFAULT_EMBEDDING_URL.to_string()
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_embedding_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_timeout() -> u64 {
    120
}

fn default_batch_size() -> u32 {
    8
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: default_embedding_url(),
            model: default_embedding_model(),
            dimension: default_embedding_dimension(),
            timeout_secs: default_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorStoreConfig {
    #[serde(default = "default_qdrant_url")]
    pub url: String,

    #[serde(default = "default_collection")]
    pub collection: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_qdrant_url() -> String {
    DEFAULT_QDRANT_URL.to_string()
}

fn default_collection() -> String {
    DEFAULT_COLLECTION.to_string()
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: default_qdrant_url(),
            collection: default_collection(),
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_url")]
    pub url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    /// No timeout when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

fn default_llm_url() -> String {
    DEFAULT_LLM_URL.to_string()
}

fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            url: default_llm_url(),
            model: default_llm_model(),
            temperature: None,
            timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    #[serde(default = "default_ingest_batch_size")]
    pub batch_size: u32,

    /// Window size in characters
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: u32,

    /// Caps chunking parallelism below the batch size
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_workers: Option<u32>,
}

fn default_ingest_batch_size() -> u32 {
    5
}

fn default_chunk_size() -> u32 {
    1000
}

fn default_chunk_overlap() -> u32 {
    200
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: default_ingest_batch_size(),
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            max_workers: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_limit() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            default_format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,

    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_retention_days() -> u32 {
    DEFAULT_METRICS_RETENTION_DAYS
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            retention_days: default_retention_days(),
        }
    }
}
