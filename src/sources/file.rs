//! Records loaded from a local JSON or JSONL file, or stdin.

use async_trait::async_trait;
use serde_json::Value;
use std::io::Read;
use std::path::{Path, PathBuf};

use super::RecordSource;
use crate::error::SourceError;
use crate::models::MaterialRecord;

/// Reads records from a path; `-` means stdin.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    fn is_stdin(&self) -> bool {
        self.path == Path::new("-")
    }

    fn read_input(&self) -> Result<String, SourceError> {
        if self.is_stdin() {
            let mut input = String::new();
            std::io::stdin().read_to_string(&mut input)?;
            Ok(input)
        } else {
            Ok(std::fs::read_to_string(&self.path)?)
        }
    }
}

#[async_trait]
impl RecordSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self) -> Result<Vec<MaterialRecord>, SourceError> {
        let source = self.clone();
        let input = tokio::task::spawn_blocking(move || source.read_input())
            .await
            .map_err(|e| SourceError::ParseError(e.to_string()))??;
        parse_records(&input)
    }
}

/// Parse a JSON array, an API-style `{"data": [...]}` body, or JSONL.
pub fn parse_records(input: &str) -> Result<Vec<MaterialRecord>, SourceError> {
    let input = input.trim();

    if input.is_empty() {
        return Ok(Vec::new());
    }

    if input.starts_with('[') {
        return serde_json::from_str(input)
            .map_err(|e| SourceError::ParseError(format!("failed to parse JSON array: {e}")));
    }

    if input.starts_with('{')
        && let Ok(Value::Object(mut body)) = serde_json::from_str::<Value>(input)
    {
        if matches!(body.get("data"), Some(Value::Array(_)))
            && let Some(Value::Array(items)) = body.remove("data")
        {
            return Ok(items.into_iter().map(MaterialRecord::new).collect());
        }
        // A single object on one line is a one-record JSONL file
        return Ok(vec![MaterialRecord::new(Value::Object(body))]);
    }

    let mut records = Vec::new();
    for (i, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| {
            SourceError::ParseError(format!("failed to parse JSON at line {}: {e}", i + 1))
        })?;
        records.push(MaterialRecord::new(value));
    }

    Ok(records)
}
