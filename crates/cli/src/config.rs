use anyhow::{bail, Context, Result};
use codesift_code_chunker::ChunkerConfig;
use codesift_vector_store::{
    DEFAULT_BATCH_SIZE, DEFAULT_COLLECTION, DEFAULT_INSERT_BATCH, DEFAULT_MODEL,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Looked up in the working directory when `--config` is not given
pub const CONFIG_FILE: &str = "codesift.toml";

/// Settings shared by every pipeline stage
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub paths: PathsConfig,
    pub chunker: ChunkerConfig,
    pub embedding: EmbeddingConfig,
    pub store: StoreConfig,
}

/// Where each stage reads and writes its artifacts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Cloned repositories land in `<clone_dir>/<repo name>`
    pub clone_dir: PathBuf,
    pub ingested: PathBuf,
    pub chunks: PathBuf,
    pub embeddings: PathBuf,
    pub persist_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            clone_dir: PathBuf::from("data/raw_code"),
            ingested: PathBuf::from("data/raw_code/ingested_code.json"),
            chunks: PathBuf::from("data/processed_chunks/processed_chunks.json"),
            embeddings: PathBuf::from("data/processed_chunks/embeddings.json"),
            persist_dir: PathBuf::from("data/chroma"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
    /// Embed only the first N chunks
    pub sample_size: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            batch_size: DEFAULT_BATCH_SIZE,
            sample_size: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub collection: String,
    pub insert_batch: usize,
    pub top_k: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            insert_batch: DEFAULT_INSERT_BATCH,
            top_k: 5,
        }
    }
}

impl PipelineConfig {
    /// Load `explicit` if given (it must exist), else `codesift.toml` in the
    /// working directory when present, else defaults
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(CONFIG_FILE).is_file() => Self::from_file(Path::new(CONFIG_FILE))?,
            None => {
                log::debug!("No {CONFIG_FILE} found, using defaults");
                Self::default()
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Err(message) = self.chunker.validate() {
            bail!("chunker: {message}");
        }
        if self.embedding.batch_size == 0 {
            bail!("embedding.batch_size must be > 0");
        }
        if self.store.insert_batch == 0 {
            bail!("store.insert_batch must be > 0");
        }
        if self.store.top_k == 0 {
            bail!("store.top_k must be > 0");
        }
        if self.store.collection.trim().is_empty() {
            bail!("store.collection must not be empty");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    #[test]
    fn defaults_match_pipeline_layout() {
        let config = PipelineConfig::default();
        assert_eq!(
            config.paths.chunks,
            PathBuf::from("data/processed_chunks/processed_chunks.json")
        );
        assert_eq!(config.paths.persist_dir, PathBuf::from("data/chroma"));
        assert_eq!(config.store.collection, "codebase_embeddings");
        assert_eq!(config.embedding.model, "all-MiniLM-L6-v2");
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.store.insert_batch, 200);
        assert_eq!(config.store.top_k, 5);
        assert!(config.chunker.deep_parse);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codesift.toml");
        std::fs::write(
            &path,
            "[embedding]\nsample_size = 10\n\n[store]\ntop_k = 3\n\n[chunker]\ndeep_parse = false\n",
        )
        .unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.embedding.sample_size, Some(10));
        assert_eq!(config.embedding.batch_size, 64);
        assert_eq!(config.store.top_k, 3);
        assert!(!config.chunker.deep_parse);
        assert_eq!(config.paths, PathsConfig::default());
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let dir = tempdir().unwrap();
        assert!(PipelineConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }

    #[test]
    fn zero_batch_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("codesift.toml");
        std::fs::write(&path, "[store]\ninsert_batch = 0\n").unwrap();

        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("insert_batch"));
    }
}
