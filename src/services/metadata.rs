//! Total mapping from raw material records to the fixed metadata schema.

use serde_json::Value;

use crate::models::{
    MagneticProperties, MaterialMetadata, MaterialRecord, NOT_AVAILABLE, Provenance, XasEdge,
};

/// Extract structured metadata from a record. Never fails: anything missing
/// or malformed resolves to its sentinel.
pub fn extract_metadata(record: &MaterialRecord) -> MaterialMetadata {
    MaterialMetadata {
        formula: record.text(&["formula_pretty"]),
        composition: record.object("composition"),
        density: record.scalar(&["density"]),
        symmetry: record.text(&["symmetry", "crystal_system"]),
        space_group: record.text(&["symmetry", "symbol"]),
        material_id: record.text(&["material_id"]),
        band_gap: record.scalar(&["band_gap"]),
        is_stable: record.scalar(&["is_stable"]),
        formation_energy_per_atom: record.scalar(&["formation_energy_per_atom"]),
        energy_above_hull: record.scalar(&["energy_above_hull"]),
        magnetic_properties: MagneticProperties {
            is_magnetic: record.flag("is_magnetic"),
            total_magnetization: record
                .field(&["total_magnetization"])
                .and_then(Value::as_f64)
                .unwrap_or(0.0),
            num_magnetic_sites: record
                .field(&["num_magnetic_sites"])
                .and_then(Value::as_u64)
                .unwrap_or(0),
        },
        elements: record.strings("elements"),
        chemsys: record.text(&["chemsys"]),
        volume: record.scalar(&["volume"]),
        structure: lattice_matrix(record),
        possible_species: record.strings("possible_species"),
        xas_spectra: record
            .list(&["xas_spectra"])
            .iter()
            .map(|entry| XasEdge {
                edge: text_of(entry, "edge"),
                absorbing_element: text_of(entry, "absorbing_element"),
            })
            .collect(),
        database_ids: record.object("database_IDs"),
        provenance: record
            .list(&["origins"])
            .iter()
            .map(|origin| Provenance {
                name: text_of(origin, "name"),
                last_updated: text_of(origin, "last_updated"),
            })
            .collect(),
    }
}

fn lattice_matrix(record: &MaterialRecord) -> Vec<Vec<f64>> {
    record
        .list(&["structure", "lattice", "matrix"])
        .iter()
        .filter_map(Value::as_array)
        .map(|row| row.iter().filter_map(Value::as_f64).collect())
        .collect()
}

fn text_of(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => NOT_AVAILABLE.to_string(),
        Some(other) => other.to_string(),
    }
}
