//! Local request log for `ask`, `search` and `ingest` runs.

use std::fmt;
use std::path::Path;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::warn;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS request_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    timestamp TEXT NOT NULL,
    operation TEXT NOT NULL,
    latency_ms INTEGER NOT NULL,
    success INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_request_log_timestamp ON request_log(timestamp);
CREATE INDEX IF NOT EXISTS idx_request_log_operation ON request_log(operation);
"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Ask,
    Search,
    Ingest,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Ask => write!(f, "ask"),
            Operation::Search => write!(f, "search"),
            Operation::Ingest => write!(f, "ingest"),
        }
    }
}

pub struct MetricsStore {
    conn: Connection,
}

impl MetricsStore {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(path = %parent.display(), error = %e, "failed to create metrics directory");
        }
        let conn = Connection::open(path)?;
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "auto_vacuum", "INCREMENTAL")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn })
    }

    /// Best effort; a failed insert never fails the request being measured.
    pub fn record(&self, operation: Operation, latency_ms: u64, success: bool) {
        let _ = self.conn.execute(
            "INSERT INTO request_log (timestamp, operation, latency_ms, success)
             VALUES (datetime('now'), ?1, ?2, ?3)",
            params![operation.to_string(), latency_ms as i64, success as i32],
        );
    }

    pub fn get_summary(&self, retention_days: u32) -> MetricsSummary {
        self.summarize(retention_days, None)
    }

    pub fn get_operation_summary(&self, operation: Operation, retention_days: u32) -> MetricsSummary {
        self.summarize(retention_days, Some(operation))
    }

    fn summarize(&self, retention_days: u32, operation: Option<Operation>) -> MetricsSummary {
        let query = format!(
            r#"
            SELECT
                COUNT(*) as total_requests,
                COALESCE(AVG(latency_ms), 0) as avg_latency_ms,
                COALESCE(SUM(CASE WHEN success = 0 THEN 1 ELSE 0 END) * 100.0 / NULLIF(COUNT(*), 0), 0) as error_rate
            FROM request_log
            WHERE timestamp >= datetime('now', '-{} days')
              AND (?1 IS NULL OR operation = ?1)
            "#,
            retention_days
        );

        self.conn
            .query_row(&query, params![operation.map(|o| o.to_string())], |row| {
                Ok(MetricsSummary {
                    total_requests: row.get::<_, i64>(0)? as u64,
                    avg_latency_ms: row.get::<_, f64>(1)? as u64,
                    error_rate: row.get::<_, f64>(2)? as f32,
                })
            })
            .unwrap_or_default()
    }

    pub fn cleanup(&self, retention_days: u32) {
        let query = format!(
            "DELETE FROM request_log WHERE timestamp < datetime('now', '-{} days')",
            retention_days
        );
        let _ = self.conn.execute(&query, []);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub total_requests: u64,
    pub avg_latency_ms: u64,
    /// Percentage of failed requests
    pub error_rate: f32,
}
