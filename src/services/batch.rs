//! Batched ingestion: parallel chunking followed by sequential upload.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::error::IngestError;
use crate::models::{Chunk, IngestConfig, MaterialRecord};
use crate::services::chunker::RecordChunker;
use crate::services::index::DocumentIndex;

/// Totals for one ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub records: usize,
    pub batches: usize,
    pub chunks_created: usize,
    pub chunks_uploaded: usize,
    pub failed_records: usize,
    pub duration_ms: u64,
}

/// Outcome of a single completed batch, handed to the observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    /// 1-based
    pub batch_number: usize,
    pub total_batches: usize,
    pub records: usize,
    pub chunks_uploaded: usize,
    pub failed_records: usize,
}

pub struct BatchProcessor {
    chunker: Arc<RecordChunker>,
    batch_size: usize,
    parallelism: usize,
}

impl BatchProcessor {
    pub fn new(chunker: RecordChunker, batch_size: usize, max_workers: Option<usize>) -> Self {
        let batch_size = batch_size.max(1);
        let available = std::thread::available_parallelism().map_or(1, |n| n.get());
        let parallelism = batch_size
            .min(available)
            .min(max_workers.unwrap_or(usize::MAX))
            .max(1);

        Self {
            chunker: Arc::new(chunker),
            batch_size,
            parallelism,
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(
            RecordChunker::from_config(config),
            config.batch_size as usize,
            config.max_workers.map(|n| n as usize),
        )
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    pub async fn process_and_store(
        &self,
        records: Vec<MaterialRecord>,
        index: &DocumentIndex,
    ) -> Result<IngestStats, IngestError> {
        self.process_and_store_with(records, index, |_| {}).await
    }

    /// Chunk and upload `records` batch by batch, calling `on_batch` after
    /// each batch has been stored. Batches never overlap.
    pub async fn process_and_store_with<F>(
        &self,
        records: Vec<MaterialRecord>,
        index: &DocumentIndex,
        mut on_batch: F,
    ) -> Result<IngestStats, IngestError>
    where
        F: FnMut(&BatchReport),
    {
        let start = Instant::now();
        let total_batches = records.len().div_ceil(self.batch_size);
        let mut stats = IngestStats {
            records: records.len(),
            ..Default::default()
        };

        let mut pending = records.into_iter().enumerate().peekable();
        let mut batch_number = 0;

        while pending.peek().is_some() {
            batch_number += 1;
            let batch: Vec<(usize, MaterialRecord)> =
                pending.by_ref().take(self.batch_size).collect();
            let batch_len = batch.len();

            let (chunks, failed) = self.chunk_batch(batch).await;
            stats.chunks_created += chunks.len();
            stats.failed_records += failed;

            let mut uploaded = 0;
            for chunk in &chunks {
                index.upload(chunk).await?;
                uploaded += 1;
            }
            stats.chunks_uploaded += uploaded;
            stats.batches += 1;

            info!(
                batch = batch_number,
                total_batches,
                records = batch_len,
                chunks = uploaded,
                failed,
                "processed, embedded, and stored batch {}",
                batch_number
            );

            on_batch(&BatchReport {
                batch_number,
                total_batches,
                records: batch_len,
                chunks_uploaded: uploaded,
                failed_records: failed,
            });
        }

        stats.duration_ms = start.elapsed().as_millis() as u64;
        Ok(stats)
    }

    /// Chunk one batch on blocking workers, at most `parallelism` at a time.
    /// Chunks come back in worker completion order. Returns the chunks and
    /// the number of records that contributed nothing due to a failure.
    async fn chunk_batch(&self, batch: Vec<(usize, MaterialRecord)>) -> (Vec<Chunk>, usize) {
        let mut workers = JoinSet::new();
        let mut task_records = HashMap::new();
        let mut queue = batch.into_iter();
        let mut chunks = Vec::new();
        let mut failed = 0;

        loop {
            while workers.len() < self.parallelism {
                let Some((record_index, record)) = queue.next() else {
                    break;
                };
                let chunker = Arc::clone(&self.chunker);
                let handle = workers.spawn_blocking(move || {
                    chunker
                        .try_chunk(&record)
                        .map(|chunks| chunks.collect::<Vec<_>>())
                });
                task_records.insert(handle.id(), record_index);
            }

            let Some(joined) = workers.join_next_with_id().await else {
                break;
            };

            match joined {
                Ok((id, Ok(record_chunks))) => {
                    task_records.remove(&id);
                    chunks.extend(record_chunks);
                }
                Ok((id, Err(e))) => {
                    let record_index = task_records.remove(&id);
                    error!(index = ?record_index, error = %e, "error processing document");
                    failed += 1;
                }
                Err(e) => {
                    let record_index = task_records.remove(&e.id());
                    error!(index = ?record_index, error = %e, "chunking worker panicked");
                    failed += 1;
                }
            }
        }

        (chunks, failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::testing::HashingEmbedder;
    use crate::services::vector_store::MemoryBackend;
    use serde_json::json;
    use std::collections::HashSet;

    fn memory_index() -> (DocumentIndex, MemoryBackend) {
        let backend = MemoryBackend::new("test", 32);
        let index = DocumentIndex::new(
            Arc::new(HashingEmbedder::new(32)),
            Box::new(backend.clone()),
        );
        (index, backend)
    }

    fn record(id: u32) -> MaterialRecord {
        MaterialRecord::new(json!({
            "material_id": format!("mp-{id}"),
            "formula_pretty": "NaCl",
        }))
    }

    #[test]
    fn test_parallelism_bounded_by_batch_size() {
        let processor = BatchProcessor::new(RecordChunker::with_defaults(), 1, None);
        assert_eq!(processor.parallelism(), 1);

        let capped = BatchProcessor::new(RecordChunker::with_defaults(), 64, Some(2));
        assert!(capped.parallelism() <= 2);

        let zero = BatchProcessor::new(RecordChunker::with_defaults(), 0, Some(0));
        assert_eq!(zero.batch_size(), 1);
        assert_eq!(zero.parallelism(), 1);
    }

    #[tokio::test]
    async fn test_failing_records_contribute_nothing() {
        let (index, backend) = memory_index();
        let processor = BatchProcessor::new(RecordChunker::with_defaults(), 3, None);

        let records = vec![
            record(1),
            MaterialRecord::new(json!("broken")),
            record(2),
            MaterialRecord::new(json!(42)),
            record(3),
        ];

        let stats = processor.process_and_store(records, &index).await.unwrap();

        assert_eq!(stats.records, 5);
        assert_eq!(stats.batches, 2);
        assert_eq!(stats.failed_records, 2);
        assert_eq!(stats.chunks_created, 3);
        assert_eq!(stats.chunks_uploaded, 3);
        assert_eq!(backend.len().await, 3);
    }

    #[tokio::test]
    async fn test_batch_size_one_runs_sequential_batches() {
        let (index, backend) = memory_index();
        let processor = BatchProcessor::new(RecordChunker::with_defaults(), 1, None);
        let records = vec![record(1), MaterialRecord::new(json!({}))];

        let mut reports = Vec::new();
        let stats = processor
            .process_and_store_with(records, &index, |r| reports.push(r.clone()))
            .await
            .unwrap();

        assert_eq!(stats.batches, 2);
        assert_eq!(reports.len(), 2);
        assert_eq!(reports[0].batch_number, 1);
        assert_eq!(reports[1].batch_number, 2);
        assert!(reports.iter().all(|r| r.total_batches == 2));
        assert!(reports.iter().all(|r| r.chunks_uploaded >= 1));

        let hits = index.search("Material ID", 10, None).await.unwrap();
        assert_eq!(hits.len(), backend.len().await);
        let doc_ids: HashSet<_> = hits.iter().map(|h| h.doc_id.clone()).collect();
        let document_ids: HashSet<_> = hits
            .iter()
            .filter_map(|h| h.metadata.get("document_id").and_then(|v| v.as_str()))
            .collect();
        assert_eq!(doc_ids.len(), hits.len());
        assert_eq!(document_ids.len(), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let (index, _) = memory_index();
        let processor = BatchProcessor::new(RecordChunker::with_defaults(), 5, None);
        let stats = processor.process_and_store(Vec::new(), &index).await.unwrap();
        assert_eq!(stats.batches, 0);
        assert_eq!(stats.chunks_uploaded, 0);
    }

    #[tokio::test]
    async fn test_upload_errors_propagate() {
        // Embedder dimension disagrees with the store, so every upload fails
        let index = DocumentIndex::new(
            Arc::new(HashingEmbedder::new(8)),
            Box::new(MemoryBackend::new("test", 16)),
        );
        let processor = BatchProcessor::new(RecordChunker::with_defaults(), 2, None);

        let result = processor.process_and_store(vec![record(1)], &index).await;
        assert!(matches!(result, Err(IngestError::Index(_))));
    }
}
