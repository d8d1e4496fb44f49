use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use std::time::Instant;

use super::open_metrics;
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};
use crate::services::{Answerer, Operation, build_index, build_language_model};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[arg(required = true, help = "Question about materials data, e.g. \"mp-149\"")]
    pub question: String,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load()?;
    let formatter = get_formatter(format);

    let index = build_index(&config).context("failed to initialize document index")?;
    let llm = build_language_model(&config).context("failed to initialize language model")?;
    let answerer = Answerer::new(llm, Arc::new(index));

    let start_time = Instant::now();
    let result = answerer.ask_with_trace(question, &[]).await;

    if let Some(metrics) = open_metrics(&config) {
        metrics.record(
            Operation::Ask,
            start_time.elapsed().as_millis() as u64,
            result.is_ok(),
        );
    }

    let answer = result.context("failed to answer question")?;
    print!("{}", formatter.format_answer(&answer, verbose));

    Ok(())
}
