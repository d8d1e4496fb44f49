//! Material records as returned by the materials database, and the fixed
//! metadata schema derived from them.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Sentinel used for any scalar field that is missing from a record.
pub const NOT_AVAILABLE: &str = "N/A";

/// A raw material record. Any field may be missing or carry an unexpected type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MaterialRecord(Value);

impl MaterialRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_object(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }

    /// Walk a nested path of object keys. Missing keys, non-object
    /// intermediates and `null` leaves all resolve to `None`.
    pub fn field(&self, path: &[&str]) -> Option<&Value> {
        let mut current = &self.0;
        for key in path {
            current = current.as_object()?.get(*key)?;
        }
        (!current.is_null()).then_some(current)
    }

    /// Scalar value at `path`, or the `"N/A"` sentinel.
    pub fn scalar(&self, path: &[&str]) -> Value {
        self.field(path)
            .cloned()
            .unwrap_or_else(|| Value::String(NOT_AVAILABLE.to_string()))
    }

    /// Display text for the value at `path`, or `"N/A"`.
    pub fn text(&self, path: &[&str]) -> String {
        self.field(path)
            .map(display_value)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn flag(&self, key: &str) -> bool {
        self.field(&[key]).and_then(Value::as_bool).unwrap_or(false)
    }

    pub fn object(&self, key: &str) -> Map<String, Value> {
        self.field(&[key])
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default()
    }

    pub fn list(&self, path: &[&str]) -> &[Value] {
        self.field(path)
            .and_then(Value::as_array)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn strings(&self, key: &str) -> Vec<String> {
        self.list(&[key])
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect()
    }

    pub fn material_id(&self) -> Option<&str> {
        self.field(&["material_id"]).and_then(Value::as_str)
    }
}

impl From<Value> for MaterialRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

/// Render a JSON value as plain text.
///
/// Strings are shown without quotes, containers use `[a, b]` and `{k: v}`.
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => NOT_AVAILABLE.to_string(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().map(display_value).collect();
            format!("[{}]", parts.join(", "))
        }
        Value::Object(map) => {
            let parts: Vec<String> = map
                .iter()
                .map(|(k, v)| format!("{}: {}", k, display_value(v)))
                .collect();
            format!("{{{}}}", parts.join(", "))
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MagneticProperties {
    pub is_magnetic: bool,
    pub total_magnetization: f64,
    pub num_magnetic_sites: u64,
}

/// One X-ray absorption edge entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XasEdge {
    pub edge: String,
    pub absorbing_element: String,
}

/// Where a property value came from and when it was last refreshed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub name: String,
    pub last_updated: String,
}

/// Normalized, fixed-shape metadata attached to every chunk of a material.
///
/// Every field is always present. Scalar fields hold the source value or the
/// `"N/A"` sentinel, containers default to empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialMetadata {
    pub formula: String,
    pub composition: Map<String, Value>,
    pub density: Value,
    pub symmetry: String,
    pub space_group: String,
    pub material_id: String,
    pub band_gap: Value,
    pub is_stable: Value,
    pub formation_energy_per_atom: Value,
    pub energy_above_hull: Value,
    pub magnetic_properties: MagneticProperties,
    pub elements: Vec<String>,
    pub chemsys: String,
    pub volume: Value,
    /// Lattice matrix rows.
    pub structure: Vec<Vec<f64>>,
    pub possible_species: Vec<String>,
    pub xas_spectra: Vec<XasEdge>,
    pub database_ids: Map<String, Value>,
    pub provenance: Vec<Provenance>,
}

impl MaterialMetadata {
    /// Whether the record was flagged as thermodynamically stable.
    pub fn stable(&self) -> bool {
        self.is_stable.as_bool().unwrap_or(false)
    }

    /// Serialize into a flat JSON object suitable for a vector store payload.
    pub fn to_payload(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        }
    }
}
