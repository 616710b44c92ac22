//! # Codesift Code Chunker
//!
//! Splits source files into semantically coherent, uniquely identified chunks
//! ready for embedding.
//!
//! ## Architecture
//!
//! ```text
//! IngestedFile { path, content }
//!     │
//!     ├──> Language detection (from extension)
//!     │
//!     ├──> python ──> PythonWalker (tree-sitter)
//!     │    ├─> Parsed: imports (file-wide), top-level def/class,
//!     │    │           module residual chunk first
//!     │    └─> Unparseable: one whole-file module chunk
//!     │
//!     ├──> others ──> GenericParser (regex imports, whole file)
//!     │
//!     └──> ChunkBuilder
//!          ├─> line bounds, loc, size
//!          ├─> complexity (python only)
//!          └─> id = sha1("{path}:{name}:{start}:{end}")
//! ```
//!
//! ## Example
//!
//! ```rust
//! use codesift_code_chunker::{Chunker, ChunkerConfig, ChunkType};
//!
//! let mut chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = "import os\n\ndef f():\n    return 1\n";
//!
//! let chunks = chunker.parse_source("a.py", code);
//! assert_eq!(chunks.len(), 2);
//! assert_eq!(chunks[0].chunk_type, ChunkType::Module);
//! assert_eq!(chunks[1].name.as_deref(), Some("f"));
//! assert_eq!((chunks[1].start_line, chunks[1].end_line), (3, 4));
//! ```

mod builder;
mod chunker;
mod complexity;
mod config;
mod docstring;
mod error;
mod generic;
mod language;
mod python;
mod segment;
mod types;

pub use builder::{chunk_id, ChunkBuilder, ChunkDraft, ABSENT_NAME};
pub use chunker::{load_chunks, save_chunks, Chunker, ChunkingStats, SourceParser, Walk};
pub use complexity::{ComplexityEstimator, BASE_COMPLEXITY};
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use generic::{extract_imports, GenericParser};
pub use language::{Language, ParserKind};
pub use python::{ParseOutcome, PythonWalker};
pub use segment::{extract_segment, slice_lines, LineSpan};
pub use types::{ChunkType, CodeChunk, IngestedFile};
