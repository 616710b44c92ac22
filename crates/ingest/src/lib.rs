//! # Codesift Ingest
//!
//! Collects the raw source files of a project for the parse pass.
//!
//! ```text
//! local path ─────────────┐
//!                         ├──> FileScanner (.gitignore aware) ──> read_files ──> ingested_code.json
//! git url ──> clone_repo ─┘
//! ```

mod clone;
mod error;
mod persist;
mod reader;
mod scanner;

pub use clone::{clone_repo, repo_name};
pub use error::{IngestError, Result};
pub use persist::{load_ingested, save_ingested};
pub use reader::{guess_mime_type, ingest_dir, read_files};
pub use scanner::FileScanner;
