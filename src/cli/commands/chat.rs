use anyhow::{Context, Result};
use clap::Args;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};

use super::open_metrics;
use crate::cli::output::get_formatter;
use crate::models::{Config, Conversation, OutputFormat, Turn, render_transcript};
use crate::services::{Answerer, Operation, build_index, build_language_model};

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[arg(long, default_value = "> ", help = "Prompt shown before each question")]
    pub prompt: String,
}

/// Input lines that control the session instead of asking a question.
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Empty,
    Exit,
    Clear,
    History,
    Question(&'a str),
}

fn parse_input(line: &str) -> ChatInput<'_> {
    match line.trim() {
        "" => ChatInput::Empty,
        "/exit" | "/quit" => ChatInput::Exit,
        "/clear" => ChatInput::Clear,
        "/history" => ChatInput::History,
        question => ChatInput::Question(question),
    }
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let index = build_index(&config).context("failed to initialize document index")?;
    let llm = build_language_model(&config).context("failed to initialize language model")?;
    let answerer = Answerer::new(llm, Arc::new(index));
    let metrics = open_metrics(&config);

    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Materials data chat. Try \"mp-555698\". Commands: /history, /clear, /exit");

    loop {
        print!("{}", args.prompt);
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        let question = match parse_input(&line) {
            ChatInput::Empty => continue,
            ChatInput::Exit => break,
            ChatInput::Clear => {
                conversation.clear();
                println!("{}", formatter.format_message("Conversation cleared."));
                continue;
            }
            ChatInput::History => {
                println!("{}", render_transcript(conversation.turns()));
                continue;
            }
            ChatInput::Question(question) => question,
        };

        let start_time = Instant::now();
        let result = answerer.ask_with_trace(question, conversation.turns()).await;
        if let Some(ref metrics) = metrics {
            metrics.record(
                Operation::Ask,
                start_time.elapsed().as_millis() as u64,
                result.is_ok(),
            );
        }

        match result {
            Ok(answer) => {
                print!("{}", formatter.format_answer(&answer, verbose));
                conversation.push(Turn::user(question));
                conversation.push(Turn::assistant(answer.text));
            }
            Err(e) => eprintln!("{}", formatter.format_error(&e.to_string())),
        }
    }

    Ok(())
}
