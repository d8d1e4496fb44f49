use anyhow::{Context, Result};
use clap::Subcommand;

use crate::cli::output::{Formatter, get_formatter};
use crate::models::{Config, OutputFormat};

const MASKED: &str = "********";

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    #[command(about = "Write a default configuration file")]
    Init {
        #[arg(long, help = "Force overwrite existing config")]
        force: bool,
    },
    #[command(about = "Show the effective configuration, including environment overrides")]
    Show,
    #[command(about = "Show configuration and data file paths")]
    Path,
}

pub async fn handle_config(cmd: ConfigCommand, format: OutputFormat, _verbose: bool) -> Result<()> {
    let formatter = get_formatter(format);

    match cmd {
        ConfigCommand::Init { force } => handle_init(force, formatter.as_ref()),
        ConfigCommand::Show => handle_show(format),
        ConfigCommand::Path => handle_path(format),
    }
}

fn handle_init(force: bool, formatter: &dyn Formatter) -> Result<()> {
    let config_path =
        Config::config_path().ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

    if config_path.exists() && !force {
        anyhow::bail!(
            "Config already exists at: {}\nUse --force to overwrite.",
            config_path.display()
        );
    }

    let path = Config::default().save().context("failed to write config")?;
    println!(
        "{}",
        formatter.format_message(&format!("Created config at: {}", path.display()))
    );
    Ok(())
}

/// Copy of `config` safe to print.
fn redacted(config: &Config) -> Config {
    let mut config = config.clone();
    if config.source.api_key.is_some() {
        config.source.api_key = Some(MASKED.to_string());
    }
    if config.vector_store.api_key.is_some() {
        config.vector_store.api_key = Some(MASKED.to_string());
    }
    config
}

fn handle_show(format: OutputFormat) -> Result<()> {
    let config = redacted(&Config::load()?);

    if format == OutputFormat::Json {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    if let Some(path) = Config::config_path().filter(|p| p.exists()) {
        println!("# Config file: {}", path.display());
    } else {
        println!("# No config file; showing defaults");
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

fn handle_path(format: OutputFormat) -> Result<()> {
    let config_path = Config::config_path();
    let metrics_path = Config::metrics_db_path();
    let env_path = std::env::current_dir().ok().map(|cwd| cwd.join(".env"));

    if format == OutputFormat::Json {
        let output = serde_json::json!({
            "config": config_path,
            "metrics": metrics_path,
            "env": env_path,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let state = |exists: bool| if exists { "active" } else { "would be" };

    if let Some(ref path) = config_path {
        println!("Config ({}): {}", state(path.exists()), path.display());
    }
    if let Some(ref path) = metrics_path {
        println!("Metrics ({}): {}", state(path.exists()), path.display());
    }
    if let Some(ref path) = env_path {
        println!(".env file ({}): {}", state(path.exists()), path.display());
    }

    Ok(())
}
