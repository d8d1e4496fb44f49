//! Record rendering and overlapping window chunking.

use tracing::error;

use crate::error::ChunkError;
use crate::models::{Chunk, IngestConfig, MaterialMetadata, MaterialRecord, display_value};
use crate::services::extract_metadata;

/// Splits material records into overlapping character windows.
#[derive(Debug, Clone)]
pub struct RecordChunker {
    /// Maximum window size in characters
    chunk_size: usize,
    /// Characters shared with the previous window
    overlap: usize,
}

impl RecordChunker {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    pub fn from_config(config: &IngestConfig) -> Self {
        Self::new(config.chunk_size as usize, config.chunk_overlap as usize)
    }

    pub fn with_defaults() -> Self {
        Self::from_config(&IngestConfig::default())
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk one record, logging and swallowing any failure.
    pub fn chunk_record(&self, record: &MaterialRecord, index: usize) -> Vec<Chunk> {
        match self.try_chunk(record) {
            Ok(chunks) => chunks.collect(),
            Err(e) => {
                error!(index, error = %e, "error processing document");
                Vec::new()
            }
        }
    }

    /// Chunk one record. Window positions are computed up front; chunks
    /// themselves are built lazily as the iterator advances.
    pub fn try_chunk(&self, record: &MaterialRecord) -> Result<RecordChunks, ChunkError> {
        if record.as_object().is_none() {
            return Err(ChunkError::MalformedRecord(format!(
                "expected a JSON object, got {}",
                json_kind(record.value())
            )));
        }

        let metadata = extract_metadata(record);
        let chars: Vec<char> = render_metadata(&metadata).chars().collect();
        let spans = self.split_with_overlap(&chars);
        if spans.is_empty() {
            return Err(ChunkError::EmptyContent);
        }

        Ok(RecordChunks {
            total: spans.len() as u32,
            chars,
            spans: spans.into_iter(),
            next_index: 0,
            document_id: Chunk::generate_id(),
            metadata,
            ingested_at: chrono::Utc::now().to_rfc3339(),
        })
    }

    /// Compute `[start, end)` character spans for each window.
    fn split_with_overlap(&self, chars: &[char]) -> Vec<(usize, usize)> {
        let total = chars.len();
        let mut spans = Vec::new();
        let mut start = 0;

        while start < total {
            let target_end = (start + self.chunk_size).min(total);
            let end = self.find_break_point(chars, start, target_end, total);

            if chars[start..end].iter().any(|c| !c.is_whitespace()) {
                spans.push((start, end));
            }

            if end >= total {
                break;
            }
            start = self.next_start(chars, start, end);
        }

        spans
    }

    /// Step back by the overlap, then forward to the next word start.
    fn next_start(&self, chars: &[char], start: usize, end: usize) -> usize {
        let mut next = end.saturating_sub(self.overlap).max(start + 1);
        while next < end && !chars[next - 1].is_whitespace() {
            next += 1;
        }
        next
    }

    /// Find a natural break point near the target end position.
    fn find_break_point(&self, chars: &[char], start: usize, target_end: usize, total: usize) -> usize {
        if target_end >= total {
            return total;
        }

        // Only the last 20% of the window is considered
        let search_start = target_end
            .saturating_sub(self.chunk_size / 5)
            .max(start + 1);

        // Priority: double newline > single newline > sentence end > whitespace
        let mut paragraph = None;
        let mut newline = None;
        let mut sentence = None;
        let mut space = None;

        for pos in search_start..target_end {
            match chars[pos] {
                '\n' => {
                    if pos > start && chars[pos - 1] == '\n' {
                        paragraph = Some(pos + 1);
                    }
                    newline = Some(pos + 1);
                }
                '.' | '!' | '?' => {
                    if chars.get(pos + 1).is_some_and(|c| c.is_whitespace()) {
                        sentence = Some(pos + 1);
                    }
                }
                c if c.is_whitespace() => {
                    space = Some(pos + 1);
                }
                _ => {}
            }
        }

        paragraph
            .or(newline)
            .or(sentence)
            .or(space)
            .unwrap_or(target_end)
    }
}

impl Default for RecordChunker {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Lazily materialized chunks of a single record.
#[derive(Debug)]
pub struct RecordChunks {
    chars: Vec<char>,
    spans: std::vec::IntoIter<(usize, usize)>,
    next_index: u32,
    total: u32,
    document_id: String,
    metadata: MaterialMetadata,
    ingested_at: String,
}

impl RecordChunks {
    pub fn document_id(&self) -> &str {
        &self.document_id
    }
}

impl Iterator for RecordChunks {
    type Item = Chunk;

    fn next(&mut self) -> Option<Chunk> {
        let (start, end) = self.spans.next()?;
        let chunk_index = self.next_index;
        self.next_index += 1;

        Some(Chunk {
            doc_id: Chunk::generate_id(),
            document_id: self.document_id.clone(),
            chunk_id: Chunk::generate_id(),
            content: self.chars[start..end].iter().collect(),
            chunk_index,
            total_chunks: self.total,
            start_offset: start as u64,
            end_offset: end as u64,
            metadata: self.metadata.clone(),
            ingested_at: self.ingested_at.clone(),
        })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.spans.size_hint()
    }
}

impl ExactSizeIterator for RecordChunks {}

/// Render metadata into the flat descriptive text that gets embedded.
pub fn render_metadata(metadata: &MaterialMetadata) -> String {
    let magnetic = &metadata.magnetic_properties;

    let lattice = if metadata.structure.is_empty() {
        crate::models::NOT_AVAILABLE.to_string()
    } else {
        let rows: Vec<String> = metadata
            .structure
            .iter()
            .map(|row| {
                let cells: Vec<String> = row.iter().map(f64::to_string).collect();
                format!("[{}]", cells.join(", "))
            })
            .collect();
        format!("[{}]", rows.join(", "))
    };

    let xas: Vec<String> = metadata
        .xas_spectra
        .iter()
        .map(|x| format!("{} edge for {}", x.edge, x.absorbing_element))
        .collect();

    let provenance: Vec<String> = metadata
        .provenance
        .iter()
        .map(|p| format!("{} Last Updated: {}", p.name, p.last_updated))
        .collect();

    let database_ids = if metadata.database_ids.is_empty() {
        crate::models::NOT_AVAILABLE.to_string()
    } else {
        display_value(&serde_json::Value::Object(metadata.database_ids.clone()))
    };

    [
        format!("Formula: {}", metadata.formula),
        format!(
            "Composition: {}",
            display_value(&serde_json::Value::Object(metadata.composition.clone()))
        ),
        format!("Density: {}", display_value(&metadata.density)),
        format!("Symmetry: {}", metadata.symmetry),
        format!("Space Group: {}", metadata.space_group),
        format!("Material ID: {}", metadata.material_id),
        format!("Band Gap: {}", display_value(&metadata.band_gap)),
        format!(
            "Stability: {}",
            if metadata.stable() { "Stable" } else { "Unstable" }
        ),
        format!(
            "Formation Energy per Atom: {} eV",
            display_value(&metadata.formation_energy_per_atom)
        ),
        format!(
            "Energy Above Hull: {} eV",
            display_value(&metadata.energy_above_hull)
        ),
        format!(
            "Magnetic Properties: {}",
            if magnetic.is_magnetic {
                "Magnetic"
            } else {
                "Non-Magnetic"
            }
        ),
        format!("Total Magnetization: {} μB", magnetic.total_magnetization),
        format!("Number of Magnetic Sites: {}", magnetic.num_magnetic_sites),
        format!("Elements: {}", metadata.elements.join(", ")),
        format!("Chemical System: {}", metadata.chemsys),
        format!("Volume: {} Å³", display_value(&metadata.volume)),
        format!("Lattice Structure: {}", lattice),
        format!("Possible Species: {}", metadata.possible_species.join(", ")),
        format!("XAS Spectra: {}", xas.join(", ")),
        format!("Database IDs: {}", database_ids),
        format!("Provenance: {}", provenance.join(", ")),
    ]
    .join(", ")
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
