use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use super::open_metrics;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{BatchProcessor, Operation, build_index};
use crate::sources::{FileSource, MaterialsProjectClient, RecordSource, fetch_or_empty};

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Read records from a JSON or JSONL file (use - for stdin) instead of the API
    #[arg(long, short = 'i')]
    pub input: Option<PathBuf>,

    #[arg(long, short = 'b', help = "Records per batch")]
    pub batch_size: Option<u32>,

    #[arg(long, short = 'n', help = "Ingest at most this many records")]
    pub limit: Option<usize>,

    #[arg(long, help = "Remove all indexed documents before ingesting")]
    pub clear: bool,
}

pub async fn handle_ingest(args: IngestArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let mut config = Config::load()?;
    if let Some(batch_size) = args.batch_size {
        config.ingest.batch_size = batch_size;
    }
    config.validate()?;

    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let source: Box<dyn RecordSource> = match args.input {
        Some(path) => Box::new(FileSource::new(path)),
        None => Box::new(
            MaterialsProjectClient::new(&config.source)
                .context("failed to create materials API client")?,
        ),
    };

    let mut records = fetch_or_empty(source.as_ref()).await;
    if let Some(limit) = args.limit {
        records.truncate(limit);
    }

    if records.is_empty() {
        println!(
            "{}",
            formatter.format_message("No material records fetched; nothing to ingest.")
        );
        return Ok(());
    }

    let index = build_index(&config).context("failed to initialize document index")?;
    index
        .ensure_ready()
        .await
        .context("vector store is not reachable")?;

    if args.clear {
        index.clear().await.context("failed to clear collection")?;
        info!(collection = index.store().collection(), "cleared collection");
    }

    let processor = BatchProcessor::from_config(&config.ingest);
    if verbose {
        eprintln!("Source: {}", source.name());
        eprintln!("  Records: {}", records.len());
        eprintln!("  Batch size: {}", processor.batch_size());
        eprintln!("  Workers: {}", processor.parallelism());
    }

    let pb = if format == OutputFormat::Text && !verbose {
        let pb = ProgressBar::new(records.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} records ({eta})",
                )?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let result = processor
        .process_and_store_with(records, &index, |report| {
            pb.inc(report.records as u64);
            pb.set_message(format!("batch {}/{}", report.batch_number, report.total_batches));
        })
        .await;
    pb.finish_and_clear();

    if let Some(metrics) = open_metrics(&config) {
        metrics.record(
            Operation::Ingest,
            start_time.elapsed().as_millis() as u64,
            result.is_ok(),
        );
    }

    let stats = result.context("ingestion failed")?;
    print!("{}", formatter.format_ingest_stats(&stats));

    Ok(())
}
