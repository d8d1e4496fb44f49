mod ask;
mod chat;
mod config;
mod ingest;
mod search;
mod status;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use config::ConfigCommand;
pub use ingest::IngestArgs;
pub use search::SearchArgs;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use config::handle_config;
pub use ingest::handle_ingest;
pub use search::handle_search;
pub use status::handle_status;

use tracing::warn;

use crate::models::Config;
use crate::services::MetricsStore;

/// Open the metrics database when enabled. Failures only disable metrics.
fn open_metrics(config: &Config) -> Option<MetricsStore> {
    if !config.metrics.enabled {
        return None;
    }

    let path = Config::metrics_db_path()?;
    match MetricsStore::open(&path) {
        Ok(store) => Some(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "metrics disabled");
            None
        }
    }
}
