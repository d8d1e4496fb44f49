//! Command-line interface for the materials chatbot.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Ask questions about materials data, answered from an indexed copy of the
/// Materials Project summary records.
#[derive(Debug, Parser)]
#[command(name = "matbot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(
        long,
        short = 'f',
        global = true,
        help = "Output format: text, json, or markdown"
    )]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Fetch material records, chunk them and store them in the vector index
    Ingest(commands::IngestArgs),

    /// Ask a single question
    Ask(commands::AskArgs),

    /// Interactive conversation that keeps prior turns as context
    Chat(commands::ChatArgs),

    /// Similarity search over indexed chunks without the language model
    Search(commands::SearchArgs),

    /// Check embedding server, vector store and language model status
    Status,

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
