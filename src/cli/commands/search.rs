use anyhow::{Context, Result};
use clap::Args;
use std::time::Instant;

use super::open_metrics;
use crate::cli::output::get_formatter;
use crate::models::{Config, MetadataFilter, OutputFormat, SearchResults};
use crate::services::{Operation, build_index, material_filter};

#[derive(Debug, Args)]
pub struct SearchArgs {
    #[arg(required = true, help = "Search query text")]
    pub query: String,

    #[arg(long, short = 'n', help = "Maximum number of results to return")]
    pub limit: Option<u32>,

    #[arg(long, short = 'm', help = "Only match chunks of this material id (e.g. mp-149)")]
    pub material: Option<String>,

    #[arg(
        long,
        help = "Exact-match filter on any metadata field, as field=value",
        conflicts_with = "material"
    )]
    pub filter: Option<String>,
}

fn parse_filter(raw: &str) -> Result<MetadataFilter> {
    let (field, value) = raw
        .split_once('=')
        .ok_or_else(|| anyhow::anyhow!("filter must look like field=value, got '{raw}'"))?;
    let (field, value) = (field.trim(), value.trim());
    if field.is_empty() || value.is_empty() {
        anyhow::bail!("filter field and value cannot be empty");
    }
    Ok(MetadataFilter::new(field, value))
}

pub async fn handle_search(args: SearchArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let query = args.query.trim();
    if query.is_empty() {
        anyhow::bail!("search query cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);
    let start_time = Instant::now();

    let limit = args.limit.unwrap_or(config.search.default_limit);
    if limit == 0 {
        anyhow::bail!("limit must be at least 1");
    }

    let filter = match (args.material, args.filter) {
        (Some(id), _) => Some(MetadataFilter::material_id(id.trim())),
        (None, Some(raw)) => Some(parse_filter(&raw)?),
        (None, None) => material_filter(query),
    };

    if verbose {
        eprintln!("Query: \"{query}\"");
        eprintln!("  Limit: {limit}");
        if let Some(ref f) = filter {
            eprintln!("  Filter: {f}");
        }
    }

    let index = build_index(&config).context("failed to initialize document index")?;
    let result = index.search(query, limit as usize, filter.as_ref()).await;

    let duration_ms = start_time.elapsed().as_millis() as u64;
    if let Some(metrics) = open_metrics(&config) {
        metrics.record(Operation::Search, duration_ms, result.is_ok());
    }

    let results = result.context("search failed")?;
    let search_results = SearchResults::new(query.to_string(), filter, results, duration_ms);

    print!("{}", formatter.format_search_results(&search_results));

    Ok(())
}
