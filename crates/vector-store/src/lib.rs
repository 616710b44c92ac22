//! # Codesift Vector Store
//!
//! Embedding generation and persistent nearest-neighbor search for code chunks.
//!
//! ## Architecture
//!
//! ```text
//! processed_chunks.json
//!     │
//!     ├──> CodeEmbedder (batched, per-item fallback)
//!     │      └─> embeddings.json  {id, path, vector, metadata}
//!     │
//!     ├──> clean_records (drop empty vectors, flatten metadata, unique ids)
//!     │
//!     └──> VectorStore (<persist_dir>/<collection>.json)
//!            └─> query: cosine similarity, top k
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use codesift_vector_store::{
//!     clean_records, load_embeddings, EmbeddingModel, VectorStore, DEFAULT_COLLECTION,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let model = EmbeddingModel::from_env("all-MiniLM-L6-v2")?;
//!     let mut store = VectorStore::open("data/chroma", DEFAULT_COLLECTION).await?;
//!
//!     let records = clean_records(load_embeddings("data/processed_chunks/embeddings.json")?);
//!     store.insert(records, 200).await?;
//!
//!     for hit in store.query_text(&model, "parse a config file", 5).await? {
//!         println!("{}: {:.3}", hit.field("path"), hit.score);
//!     }
//!     Ok(())
//! }
//! ```

mod embedder;
mod embeddings;
mod error;
mod records;
mod store;
mod types;

pub use embedder::{load_embeddings, load_records, CodeEmbedder, EmbedReport, DEFAULT_BATCH_SIZE};
pub use embeddings::{
    known_dimension, EmbeddingMode, EmbeddingModel, EmbeddingProvider, DEFAULT_MODEL,
    EMBEDDING_MODE_ENV,
};
pub use error::{Result, VectorStoreError};
pub use records::{chunk_id, chunk_path, chunk_text, METADATA_KEYS};
pub use store::{clean_records, VectorStore, DEFAULT_COLLECTION, DEFAULT_INSERT_BATCH};
pub use types::{EmbeddingRecord, SearchHit, StoredRecord};
