use crate::error::{Result, VectorStoreError};
use async_trait::async_trait;
use ndarray::ArrayView1;
use std::env;
#[cfg(feature = "fastembed")]
use std::sync::Arc;
#[cfg(feature = "fastembed")]
use tokio::task::spawn_blocking;

/// Environment variable selecting the embedding backend
pub const EMBEDDING_MODE_ENV: &str = "CODESIFT_EMBEDDING_MODE";

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "all-MiniLM-L6-v2";

const STUB_DIMENSION: usize = 384;

/// Anything that turns text into vectors
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embeddings for `texts`, in input order
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])
            .await?
            .pop()
            .ok_or_else(|| VectorStoreError::EmbeddingError("Empty embedding result".to_string()))
    }

    fn dimension(&self) -> usize;
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum EmbeddingMode {
    /// Local ONNX model through fastembed
    Fast,
    /// Deterministic hash embedding, no model files
    Stub,
}

impl EmbeddingMode {
    pub fn from_env() -> Result<Self> {
        match env::var(EMBEDDING_MODE_ENV) {
            Ok(raw) => Self::parse(&raw),
            Err(_) => Ok(Self::default_mode()),
        }
    }

    fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fast" => Ok(Self::Fast),
            "stub" => Ok(Self::Stub),
            other => Err(VectorStoreError::EmbeddingError(format!(
                "Unsupported {EMBEDDING_MODE_ENV} '{other}' (expected 'fast' or 'stub')"
            ))),
        }
    }

    const fn default_mode() -> Self {
        if cfg!(feature = "fastembed") {
            Self::Fast
        } else {
            Self::Stub
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fast => "fast",
            Self::Stub => "stub",
        }
    }
}

/// Lowercased model name without an organisation prefix
fn normalize_model_name(raw: &str) -> String {
    let lowered = raw.trim().to_ascii_lowercase();
    match lowered.rsplit_once('/') {
        Some((_, name)) => name.to_string(),
        None => lowered,
    }
}

/// Output width of the models this crate knows about
pub fn known_dimension(model_name: &str) -> Option<usize> {
    match normalize_model_name(model_name).as_str() {
        "all-minilm-l6-v2" | "bge-small-en-v1.5" => Some(384),
        "bge-base-en-v1.5" | "nomic-embed-text-v1.5" => Some(768),
        _ => None,
    }
}

#[cfg(feature = "fastembed")]
fn fastembed_model(model_name: &str) -> Option<fastembed::EmbeddingModel> {
    use fastembed::EmbeddingModel as Model;
    match normalize_model_name(model_name).as_str() {
        "all-minilm-l6-v2" => Some(Model::AllMiniLML6V2),
        "bge-small-en-v1.5" => Some(Model::BGESmallENV15),
        "bge-base-en-v1.5" => Some(Model::BGEBaseENV15),
        "nomic-embed-text-v1.5" => Some(Model::NomicEmbedTextV15),
        _ => None,
    }
}

#[derive(Clone)]
struct StubBackend {
    dimension: usize,
}

impl StubBackend {
    const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn embed_batch(&self, texts: &[String]) -> Vec<Vec<f32>> {
        texts
            .iter()
            .map(|text| stub_embed(text, self.dimension))
            .collect()
    }
}

/// Sentence embedding model selected by [`EMBEDDING_MODE_ENV`]
pub struct EmbeddingModel {
    backend: EmbeddingBackend,
    dimension: usize,
    name: String,
}

enum EmbeddingBackend {
    #[cfg(feature = "fastembed")]
    Fast(Arc<fastembed::TextEmbedding>),
    Stub(StubBackend),
}

impl EmbeddingModel {
    /// Load `model_name` with the backend chosen by the environment
    pub fn from_env(model_name: &str) -> Result<Self> {
        let mode = EmbeddingMode::from_env()?;
        Self::with_mode(mode, model_name)
    }

    pub fn with_mode(mode: EmbeddingMode, model_name: &str) -> Result<Self> {
        match mode {
            EmbeddingMode::Stub => Ok(Self::stub(model_name)),
            EmbeddingMode::Fast => Self::fast(model_name),
        }
    }

    /// Hash-based model; dimension follows `model_name` when it is known
    pub fn stub(model_name: &str) -> Self {
        let dimension = known_dimension(model_name).unwrap_or(STUB_DIMENSION);
        log::debug!("Using stub embeddings for '{model_name}' ({dimension} dims)");
        Self {
            backend: EmbeddingBackend::Stub(StubBackend::new(dimension)),
            dimension,
            name: model_name.to_string(),
        }
    }

    #[cfg(feature = "fastembed")]
    fn fast(model_name: &str) -> Result<Self> {
        use fastembed::{InitOptions, TextEmbedding};

        let (Some(model), Some(dimension)) =
            (fastembed_model(model_name), known_dimension(model_name))
        else {
            return Err(VectorStoreError::EmbeddingError(format!(
                "Unknown embedding model '{model_name}'"
            )));
        };

        log::info!("Loading embedding model '{model_name}' (this may take a moment)");
        let options = InitOptions::new(model).with_show_download_progress(false);
        let embedding = TextEmbedding::try_new(options).map_err(|e| {
            VectorStoreError::EmbeddingError(format!("Failed to initialize model: {e}"))
        })?;
        log::info!("Embedding model '{model_name}' loaded");

        Ok(Self {
            backend: EmbeddingBackend::Fast(Arc::new(embedding)),
            dimension,
            name: model_name.to_string(),
        })
    }

    #[cfg(not(feature = "fastembed"))]
    fn fast(model_name: &str) -> Result<Self> {
        Err(VectorStoreError::EmbeddingError(format!(
            "{EMBEDDING_MODE_ENV}=fast for '{model_name}' needs the `fastembed` feature"
        )))
    }

    #[must_use]
    pub const fn dimension(&self) -> usize {
        self.dimension
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn mode(&self) -> EmbeddingMode {
        match &self.backend {
            #[cfg(feature = "fastembed")]
            EmbeddingBackend::Fast(_) => EmbeddingMode::Fast,
            EmbeddingBackend::Stub(_) => EmbeddingMode::Stub,
        }
    }

    /// Cosine similarity; 0 for mismatched lengths or zero vectors
    #[must_use]
    pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
        if a.len() != b.len() {
            return 0.0;
        }

        let a = ArrayView1::from(a);
        let b = ArrayView1::from(b);
        let norm_a = a.dot(&a).sqrt();
        let norm_b = b.dot(&b).sqrt();

        if norm_a == 0.0 || norm_b == 0.0 {
            return 0.0;
        }

        a.dot(&b) / (norm_a * norm_b)
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingModel {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        match &self.backend {
            EmbeddingBackend::Stub(stub) => Ok(stub.embed_batch(texts)),
            #[cfg(feature = "fastembed")]
            EmbeddingBackend::Fast(model) => {
                let model = model.clone();
                let owned = texts.to_vec();
                spawn_blocking(move || model.embed(owned, None))
                    .await
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("Join error: {e}")))?
                    .map_err(|e| VectorStoreError::EmbeddingError(format!("{e}")))
            }
        }
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

fn normalize(vec: &mut [f32]) {
    let norm = vec.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm == 0.0 {
        return;
    }
    for value in vec {
        *value /= norm;
    }
}

fn stub_embed(text: &str, dimension: usize) -> Vec<f32> {
    let mut state =
        fnv1a_64(text.as_bytes()) ^ (dimension as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    let mut vec = Vec::with_capacity(dimension);
    for _ in 0..dimension {
        let bits = splitmix64(&mut state);
        let high = (bits >> 32) as u32;
        let mantissa = high >> 9;
        let unit = f32::from_bits(0x3f80_0000 | mantissa) - 1.0;
        vec.push(unit.mul_add(2.0, -1.0));
    }
    normalize(&mut vec);
    vec
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

const fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
