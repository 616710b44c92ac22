use thiserror::Error;

/// Result type for chunker operations
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur while setting up or persisting a parse pass.
///
/// Malformed source is not an error: the Python walker degrades such files to a
/// single module chunk and only logs the reason.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Tree-sitter grammar could not be loaded
    #[error("Tree-sitter error: {0}")]
    TreeSitterError(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Chunk list could not be (de)serialized
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl ChunkerError {
    /// Create a tree-sitter error
    pub fn tree_sitter(msg: impl Into<String>) -> Self {
        Self::TreeSitterError(msg.into())
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
