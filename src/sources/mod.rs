//! Material record sources.

mod file;
mod materials_project;

pub use file::{FileSource, parse_records};
pub use materials_project::MaterialsProjectClient;

use async_trait::async_trait;
use tracing::error;

use crate::error::SourceError;
use crate::models::MaterialRecord;

/// Somewhere material records can be loaded from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Human-readable name for logs and output.
    fn name(&self) -> &str;

    async fn fetch(&self) -> Result<Vec<MaterialRecord>, SourceError>;
}

/// Fetch records, logging a failure and reporting it as "no data".
pub async fn fetch_or_empty(source: &dyn RecordSource) -> Vec<MaterialRecord> {
    match source.fetch().await {
        Ok(records) => records,
        Err(e) => {
            error!(source = source.name(), error = %e, "failed to fetch material records");
            Vec::new()
        }
    }
}
