use anyhow::Result;

use super::open_metrics;
use crate::cli::output::{ServiceStatus, StatusInfo, get_formatter};
use crate::models::{Config, OutputFormat};
use crate::services::{build_embedder, build_language_model, create_backend};

async fn embedding_status(config: &Config) -> ServiceStatus {
    let mut status = ServiceStatus {
        name: "Embedding".to_string(),
        url: config.embedding.url.clone(),
        connected: false,
        model: Some(config.embedding.model.clone()),
        detail: None,
    };

    match build_embedder(config) {
        Ok(embedder) => match embedder.health_check().await {
            Ok(served) => {
                status.connected = true;
                if served.is_some() {
                    status.model = served;
                }
            }
            Err(e) => status.detail = Some(e.to_string()),
        },
        Err(e) => status.detail = Some(e.to_string()),
    }
    status
}

async fn vector_store_status(config: &Config) -> (ServiceStatus, Option<u64>) {
    let mut status = ServiceStatus {
        name: "Vector Store".to_string(),
        url: config.vector_store.url.clone(),
        connected: false,
        model: None,
        detail: None,
    };

    let store = match create_backend(
        &config.vector_store,
        config.embedding.dimension as usize,
    ) {
        Ok(store) => store,
        Err(e) => {
            status.detail = Some(e.to_string());
            return (status, None);
        }
    };

    status.connected = store.health_check().await.unwrap_or(false);
    let points = if status.connected {
        store
            .collection_info()
            .await
            .ok()
            .flatten()
            .map(|info| info.points_count)
    } else {
        None
    };
    (status, points)
}

async fn llm_status(config: &Config) -> ServiceStatus {
    let mut status = ServiceStatus {
        name: "LLM".to_string(),
        url: config.llm.url.clone(),
        connected: false,
        model: Some(config.llm.model.clone()),
        detail: None,
    };

    match build_language_model(config) {
        Ok(llm) => match llm.health_check().await {
            Ok(true) => status.connected = true,
            Ok(false) => {
                status.connected = true;
                status.detail = Some("model not installed on server".to_string());
            }
            Err(e) => status.detail = Some(e.to_string()),
        },
        Err(e) => status.detail = Some(e.to_string()),
    }
    status
}

pub async fn handle_status(format: OutputFormat, _verbose: bool) -> Result<()> {
    let config = Config::load()?;
    let formatter = get_formatter(format);

    let embedding = embedding_status(&config).await;
    let (vector_store, points) = vector_store_status(&config).await;
    let llm = llm_status(&config).await;

    let metrics = if config.metrics.enabled {
        open_metrics(&config).map(|m| {
            m.cleanup(config.metrics.retention_days);
            m.get_summary(config.metrics.retention_days)
        })
    } else {
        None
    };

    let status = StatusInfo {
        embedding,
        llm,
        vector_store,
        collection: config.vector_store.collection.clone(),
        points,
        metrics,
    };

    print!("{}", formatter.format_status(&status));

    if format == OutputFormat::Text {
        if !status.embedding.connected {
            eprintln!();
            eprintln!("Warning: embedding server not reachable at {}", config.embedding.url);
        }
        if !status.vector_store.connected {
            eprintln!();
            eprintln!("Warning: Qdrant not running. Start with: docker run -p 6334:6334 qdrant/qdrant");
        }
        if !status.llm.connected {
            eprintln!();
            eprintln!(
                "Warning: language model server not reachable. Try: ollama pull {}",
                config.llm.model
            );
        }
        if config.source.api_key.is_none() {
            eprintln!();
            eprintln!("Hint: set MATERIALS_PROJECT_API_KEY to ingest from the Materials Project API.");
        }
    }

    Ok(())
}
