use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded `/stat/v1/data` payload.
///
/// Fields the engine does not interpret are kept in `extra` so a cached copy
/// serializes back to the same document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawResult {
    /// Echo of the executed query, including the column ids
    #[serde(default)]
    pub query: ResultQuery,

    #[serde(default)]
    pub data: Vec<ResultRow>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampled: Option<bool>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub totals: Vec<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RawResult {
    /// No rows were returned
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Column metadata echoed back by the API
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultQuery {
    #[serde(default)]
    pub dimensions: Vec<String>,

    #[serde(default)]
    pub metrics: Vec<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One row: ordered dimension values followed by ordered metric values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultRow {
    #[serde(default)]
    pub dimensions: Vec<DimensionValue>,

    #[serde(default)]
    pub metrics: Vec<f64>,
}

/// Dimension cell. `name` is null for unknown values (e.g. an untitled page).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DimensionValue {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl DimensionValue {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            extra: Map::new(),
        }
    }
}
