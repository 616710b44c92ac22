use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One line of `embeddings.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub path: String,

    /// `None` when the producer wrote `null` or nothing
    #[serde(default)]
    pub vector: Option<Vec<f32>>,

    /// Chunk fields copied through: language, type, name, imports, loc, size
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// A record as held by the store: flat string metadata only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    pub id: String,
    pub score: f32,
    pub metadata: BTreeMap<String, String>,
}

impl SearchHit {
    /// Metadata value, or `""` when absent
    pub fn field(&self, key: &str) -> &str {
        self.metadata.get(key).map_or("", String::as_str)
    }
}
