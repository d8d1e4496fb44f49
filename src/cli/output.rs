use std::fmt::Write as FmtWrite;

use serde::Serialize;

use crate::models::{OutputFormat, ScoredDocument, SearchResults};
use crate::services::{Answer, IngestStats, MetricsSummary};

pub trait Formatter {
    fn format_search_results(&self, results: &SearchResults) -> String;
    fn format_answer(&self, answer: &Answer, verbose: bool) -> String;
    fn format_ingest_stats(&self, stats: &IngestStats) -> String;
    fn format_status(&self, status: &StatusInfo) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceStatus {
    pub name: String,
    pub url: String,
    pub connected: bool,
    /// Model served or configured, when known
    pub model: Option<String>,
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusInfo {
    pub embedding: ServiceStatus,
    pub llm: ServiceStatus,
    pub vector_store: ServiceStatus,
    pub collection: String,
    pub points: Option<u64>,
    pub metrics: Option<MetricsSummary>,
}

impl StatusInfo {
    pub fn services(&self) -> [&ServiceStatus; 3] {
        [&self.embedding, &self.vector_store, &self.llm]
    }
}

fn preview(content: &str, max_chars: usize) -> String {
    let head: String = content.chars().take(max_chars).collect();
    if content.chars().count() > max_chars {
        format!("{}...", head)
    } else {
        head
    }
}

fn source_label(doc: &ScoredDocument) -> String {
    match (doc.material_id(), doc.formula()) {
        (Some(id), Some(formula)) => format!("{} ({})", id, formula),
        (Some(id), None) => id.to_string(),
        _ => doc.doc_id.clone(),
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("No results found for: {}\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "Search results for: \"{}\"", results.query).unwrap();
        if let Some(ref filter) = results.filter {
            writeln!(output, "Filter: {}", filter).unwrap();
        }
        writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(output, "{}. [Score: {:.3}]", i + 1, result.score).unwrap();
            writeln!(output, "   Material: {}", source_label(result)).unwrap();
            writeln!(output, "   ---").unwrap();
            for line in preview(&result.content, 200).lines() {
                writeln!(output, "   {}", line).unwrap();
            }
            writeln!(output).unwrap();
        }

        output
    }

    fn format_answer(&self, answer: &Answer, verbose: bool) -> String {
        let mut output = String::new();
        writeln!(output, "{}", answer.text.trim_end()).unwrap();

        if verbose {
            writeln!(output).unwrap();
            writeln!(output, "---").unwrap();
            writeln!(output, "Query:   {}", answer.query.question).unwrap();
            writeln!(output, "k:       {}", answer.k).unwrap();
            if let Some(ref filter) = answer.filter {
                writeln!(output, "Filter:  {}", filter).unwrap();
            }
            writeln!(output, "Sources: {}", answer.sources.len()).unwrap();
            for source in &answer.sources {
                writeln!(output, "  - {} [{:.3}]", source_label(source), source.score).unwrap();
            }
        }

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        writeln!(output, "Ingestion Complete").unwrap();
        writeln!(output, "------------------").unwrap();
        writeln!(output, "Records:         {}", stats.records).unwrap();
        writeln!(output, "Batches:         {}", stats.batches).unwrap();
        writeln!(output, "Chunks created:  {}", stats.chunks_created).unwrap();
        writeln!(output, "Chunks uploaded: {}", stats.chunks_uploaded).unwrap();
        if stats.failed_records > 0 {
            writeln!(output, "Failed records:  {}", stats.failed_records).unwrap();
        }
        writeln!(output, "Duration:        {}ms", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "Status").unwrap();
        writeln!(output, "------").unwrap();

        for service in status.services() {
            let state = if service.connected {
                "[CONNECTED]"
            } else {
                "[DISCONNECTED]"
            };
            writeln!(output, "{:<14} {}", format!("{}:", service.name), state).unwrap();
            writeln!(output, "  URL:         {}", service.url).unwrap();
            if let Some(ref model) = service.model {
                writeln!(output, "  Model:       {}", model).unwrap();
            }
            if let Some(ref detail) = service.detail {
                writeln!(output, "  Detail:      {}", detail).unwrap();
            }
        }

        writeln!(output).unwrap();
        writeln!(output, "Collection:    {}", status.collection).unwrap();
        if let Some(points) = status.points {
            writeln!(output, "  Points:      {}", points).unwrap();
        }

        if let Some(ref m) = status.metrics {
            writeln!(output).unwrap();
            writeln!(output, "Requests:      {}", m.total_requests).unwrap();
            writeln!(output, "  Avg Latency: {}ms", m.avg_latency_ms).unwrap();
            if m.error_rate > 0.0 {
                writeln!(output, "  Error Rate:  {:.1}%", m.error_rate).unwrap();
            }
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }

    fn format_error(&self, error: &str) -> String {
        format!("Error: {}", error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }
}

impl Formatter for JsonFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        self.render(results)
    }

    fn format_answer(&self, answer: &Answer, verbose: bool) -> String {
        if verbose {
            self.render(answer)
        } else {
            self.render(&serde_json::json!({ "answer": answer.text }))
        }
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        self.render(stats)
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        self.render(status)
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({ "error": error }))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_search_results(&self, results: &SearchResults) -> String {
        if results.is_empty() {
            return format!("## No results found\n\nQuery: `{}`\n", results.query);
        }

        let mut output = String::new();
        writeln!(output, "## Search Results\n").unwrap();
        writeln!(output, "**Query:** `{}`\n", results.query).unwrap();
        if let Some(ref filter) = results.filter {
            writeln!(output, "**Filter:** `{}`\n", filter).unwrap();
        }
        writeln!(
            output,
            "Found {} results in {}ms\n",
            results.len(),
            results.duration_ms
        )
        .unwrap();

        for (i, result) in results.results.iter().enumerate() {
            writeln!(output, "### {}. Score: {:.3}\n", i + 1, result.score).unwrap();
            writeln!(output, "**Material:** `{}`\n", source_label(result)).unwrap();
            writeln!(output, "```").unwrap();
            writeln!(output, "{}", result.content).unwrap();
            writeln!(output, "```\n").unwrap();
        }

        output
    }

    fn format_answer(&self, answer: &Answer, verbose: bool) -> String {
        let mut output = String::new();
        writeln!(output, "{}\n", answer.text.trim_end()).unwrap();

        if verbose {
            writeln!(output, "### Retrieval\n").unwrap();
            writeln!(output, "- **Query:** `{}`", answer.query.question).unwrap();
            writeln!(output, "- **k:** {}", answer.k).unwrap();
            if let Some(ref filter) = answer.filter {
                writeln!(output, "- **Filter:** `{}`", filter).unwrap();
            }
            for source in &answer.sources {
                writeln!(
                    output,
                    "- `{}` (score {:.3})",
                    source_label(source),
                    source.score
                )
                .unwrap();
            }
        }

        output
    }

    fn format_ingest_stats(&self, stats: &IngestStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Ingestion Complete\n").unwrap();
        writeln!(output, "| Metric | Value |").unwrap();
        writeln!(output, "|--------|-------|").unwrap();
        writeln!(output, "| Records | {} |", stats.records).unwrap();
        writeln!(output, "| Batches | {} |", stats.batches).unwrap();
        writeln!(output, "| Chunks created | {} |", stats.chunks_created).unwrap();
        writeln!(output, "| Chunks uploaded | {} |", stats.chunks_uploaded).unwrap();
        writeln!(output, "| Failed records | {} |", stats.failed_records).unwrap();
        writeln!(output, "| Duration | {}ms |", stats.duration_ms).unwrap();
        output
    }

    fn format_status(&self, status: &StatusInfo) -> String {
        let mut output = String::new();
        writeln!(output, "## Status\n").unwrap();

        for service in status.services() {
            let state = if service.connected { "✅" } else { "❌" };
            writeln!(output, "### {} {}\n", service.name, state).unwrap();
            writeln!(output, "- **URL:** `{}`", service.url).unwrap();
            if let Some(ref model) = service.model {
                writeln!(output, "- **Model:** {}", model).unwrap();
            }
            if let Some(ref detail) = service.detail {
                writeln!(output, "- **Detail:** {}", detail).unwrap();
            }
            writeln!(output).unwrap();
        }

        writeln!(output, "- **Collection:** {}", status.collection).unwrap();
        if let Some(points) = status.points {
            writeln!(output, "- **Points:** {}", points).unwrap();
        }
        if let Some(ref m) = status.metrics {
            writeln!(output, "- **Requests:** {}", m.total_requests).unwrap();
            writeln!(output, "- **Avg Latency:** {}ms", m.avg_latency_ms).unwrap();
            if m.error_rate > 0.0 {
                writeln!(output, "- **Error Rate:** {:.1}%", m.error_rate).unwrap();
            }
        }

        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("> {}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> ⚠️ **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MetadataFilter;
    use crate::services::DecomposedQuery;
    use serde_json::json;

    fn scored(id: &str, formula: &str, content: &str) -> ScoredDocument {
        let mut metadata = serde_json::Map::new();
        metadata.insert("material_id".to_string(), json!(id));
        metadata.insert("formula".to_string(), json!(formula));
        ScoredDocument {
            doc_id: "doc".to_string(),
            score: 0.875,
            content: content.to_string(),
            metadata,
        }
    }

    fn answer() -> Answer {
        Answer {
            text: "It is 0.61 eV.\n".to_string(),
            query: DecomposedQuery {
                question: "mp-149".to_string(),
                k: 1,
            },
            k: 1,
            filter: Some(MetadataFilter::material_id("mp-149")),
            sources: vec![scored("mp-149", "Si", "Formula: Si")],
            context: "Formula: Si".to_string(),
        }
    }

    #[test]
    fn test_text_search_results() {
        let results = SearchResults::new(
            "silicon".to_string(),
            None,
            vec![scored("mp-149", "Si", &"x".repeat(250))],
            12,
        );
        let output = TextFormatter.format_search_results(&results);
        assert!(output.contains("Found 1 results in 12ms"));
        assert!(output.contains("Material: mp-149 (Si)"));
        assert!(output.contains("[Score: 0.875]"));
        assert!(output.contains(&format!("{}...", "x".repeat(200))));
    }

    #[test]
    fn test_text_empty_results() {
        let results = SearchResults::new("nothing".to_string(), None, Vec::new(), 1);
        assert_eq!(
            TextFormatter.format_search_results(&results),
            "No results found for: nothing\n"
        );
    }

    #[test]
    fn test_text_answer_verbose_shows_retrieval() {
        let plain = TextFormatter.format_answer(&answer(), false);
        assert_eq!(plain, "It is 0.61 eV.\n");

        let verbose = TextFormatter.format_answer(&answer(), true);
        assert!(verbose.contains("Filter:  material_id=mp-149"));
        assert!(verbose.contains("mp-149 (Si) [0.875]"));
    }

    #[test]
    fn test_json_answer() {
        let output = JsonFormatter::new(false).format_answer(&answer(), false);
        assert_eq!(output, r#"{"answer":"It is 0.61 eV.\n"}"#);

        let verbose: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(true).format_answer(&answer(), true)).unwrap();
        assert_eq!(verbose["query"]["question"], "mp-149");
        assert_eq!(verbose["filter"]["value"], "mp-149");
    }

    #[test]
    fn test_ingest_stats_formats() {
        let stats = IngestStats {
            records: 10,
            batches: 2,
            chunks_created: 12,
            chunks_uploaded: 12,
            failed_records: 1,
            duration_ms: 40,
        };
        assert!(TextFormatter.format_ingest_stats(&stats).contains("Failed records:  1"));
        assert!(MarkdownFormatter.format_ingest_stats(&stats).contains("| Chunks uploaded | 12 |"));

        let json: serde_json::Value =
            serde_json::from_str(&JsonFormatter::new(false).format_ingest_stats(&stats)).unwrap();
        assert_eq!(json["chunks_created"], 12);
    }

    #[test]
    fn test_status_lists_every_service() {
        let service = |name: &str, connected| ServiceStatus {
            name: name.to_string(),
            url: "http://localhost".to_string(),
            connected,
            model: None,
            detail: None,
        };
        let status = StatusInfo {
            embedding: service("Embedding", true),
            llm: service("LLM", false),
            vector_store: service("Vector Store", true),
            collection: "chatbot_data".to_string(),
            points: Some(42),
            metrics: None,
        };

        let text = TextFormatter.format_status(&status);
        assert!(text.contains("Embedding:     [CONNECTED]"));
        assert!(text.contains("LLM:           [DISCONNECTED]"));
        assert!(text.contains("Points:      42"));
    }

    #[test]
    fn test_get_formatter() {
        let formatter = get_formatter(OutputFormat::Json);
        assert_eq!(formatter.format_message("hi"), "{\n  \"message\": \"hi\"\n}");
    }
}
