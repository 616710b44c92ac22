use serde::{Deserialize, Serialize};

/// Configuration for a parse pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Use the syntax-tree path for languages that have one.
    /// When off, every file goes through the generic parser.
    pub deep_parse: bool,

    /// Files larger than this many bytes skip deep parsing and are emitted
    /// as one generic chunk (`None` = no limit)
    pub max_file_bytes: Option<usize>,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            deep_parse: true,
            max_file_bytes: None,
        }
    }
}

impl ChunkerConfig {
    /// Create config that never builds a syntax tree
    pub fn generic_only() -> Self {
        Self {
            deep_parse: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.max_file_bytes == Some(0) {
            return Err("max_file_bytes must be > 0 when set".to_string());
        }
        Ok(())
    }

    /// Whether a file of `len` bytes may take the deep path
    pub fn allows_deep_parse(&self, len: usize) -> bool {
        self.deep_parse && self.max_file_bytes.map_or(true, |limit| len <= limit)
    }
}
