use crate::builder::ChunkBuilder;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::generic::GenericParser;
use crate::language::{Language, ParserKind};
use crate::python::PythonWalker;
use crate::types::{ChunkType, CodeChunk, IngestedFile};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Chunks produced for one file plus the reason the file was degraded, if it was
#[derive(Debug)]
pub struct Walk {
    pub chunks: Vec<CodeChunk>,
    pub degraded: Option<String>,
}

/// One parser variant: turns a whole file into chunks.
///
/// Implementations never fail; anything they cannot understand is emitted
/// as a coarser chunk instead, with the reason in [`Walk::degraded`].
pub trait SourceParser {
    fn parse(&mut self, builder: &mut ChunkBuilder, path: &str, content: &str) -> Walk;
}

/// Main parse-pass interface.
///
/// Owns the tree-sitter parsers for its whole lifetime; construct one per
/// pass (or per worker) and feed it files in order.
pub struct Chunker {
    config: ChunkerConfig,
    builder: ChunkBuilder,
    python: PythonWalker,
    stats: ChunkingStats,
}

impl Chunker {
    /// Create a new chunker with configuration
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate().map_err(ChunkerError::invalid_config)?;
        Ok(Self {
            config,
            builder: ChunkBuilder::new()?,
            python: PythonWalker::new()?,
            stats: ChunkingStats::default(),
        })
    }

    /// Chunk one ingested file
    pub fn parse_file(&mut self, file: &IngestedFile) -> Vec<CodeChunk> {
        self.parse_source(&file.path, &file.content)
    }

    /// Chunk `content`, picking the parser from the extension of `path`
    pub fn parse_source(&mut self, path: &str, content: &str) -> Vec<CodeChunk> {
        let language = Language::from_path(path);
        let kind = self.parser_kind(language, path, content);

        let mut generic;
        let parser: &mut dyn SourceParser = match kind {
            ParserKind::Python => &mut self.python,
            ParserKind::Generic => {
                generic = GenericParser::new(language);
                &mut generic
            }
        };
        let walk = parser.parse(&mut self.builder, path, content);

        if walk.degraded.is_some() {
            self.stats.degraded_files += 1;
        }
        self.stats.record(&walk.chunks);
        walk.chunks
    }

    /// Parser variant for `language`, after the config's deep-parse limits
    fn parser_kind(&self, language: Language, path: &str, content: &str) -> ParserKind {
        match language.parser_kind() {
            ParserKind::Python if !self.config.allows_deep_parse(content.len()) => {
                log::debug!("{path}: deep parse skipped ({} bytes)", content.len());
                ParserKind::Generic
            }
            kind => kind,
        }
    }

    /// Chunk every file, keeping file order
    pub fn parse_all<'a, I>(&mut self, files: I) -> Vec<CodeChunk>
    where
        I: IntoIterator<Item = &'a IngestedFile>,
    {
        let mut chunks = Vec::new();
        for file in files {
            chunks.extend(self.parse_file(file));
        }
        log::info!("Parsed {}", self.stats);
        chunks
    }

    /// Like [`parse_all`](Self::parse_all), but writes each file's chunks to
    /// `writer` as soon as they exist. The output is the same JSON array
    /// [`save_chunks`] produces. Returns the number of chunks written.
    pub fn parse_to_writer<'a, I, W>(&mut self, files: I, mut writer: W) -> Result<usize>
    where
        I: IntoIterator<Item = &'a IngestedFile>,
        W: Write,
    {
        let mut written = 0;
        writer.write_all(b"[")?;
        for file in files {
            for chunk in self.parse_file(file) {
                let separator: &[u8] = if written == 0 { b"\n" } else { b",\n" };
                writer.write_all(separator)?;
                serde_json::to_writer_pretty(&mut writer, &chunk)?;
                written += 1;
            }
        }
        writer.write_all(b"\n]\n")?;
        writer.flush()?;
        log::info!("Parsed {}", self.stats);
        Ok(written)
    }

    /// Get configuration
    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Counters accumulated since construction or the last [`take_stats`](Self::take_stats)
    #[must_use]
    pub const fn stats(&self) -> &ChunkingStats {
        &self.stats
    }

    pub fn take_stats(&mut self) -> ChunkingStats {
        std::mem::take(&mut self.stats)
    }
}

/// Write chunks as a pretty JSON array, creating parent directories
pub fn save_chunks(path: impl AsRef<Path>, chunks: &[CodeChunk]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, chunks)?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    log::info!("Saved {} chunks to {}", chunks.len(), path.display());
    Ok(())
}

/// Read a chunk array written by [`save_chunks`] or [`Chunker::parse_to_writer`]
pub fn load_chunks(path: impl AsRef<Path>) -> Result<Vec<CodeChunk>> {
    let reader = BufReader::new(File::open(path.as_ref())?);
    Ok(serde_json::from_reader(reader)?)
}

/// Statistics about a parse pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkingStats {
    pub files: usize,
    pub total_chunks: usize,
    pub modules: usize,
    pub functions: usize,
    pub classes: usize,
    /// Python files kept whole because they did not parse
    pub degraded_files: usize,
}

impl ChunkingStats {
    fn record(&mut self, chunks: &[CodeChunk]) {
        self.files += 1;
        self.total_chunks += chunks.len();
        for chunk in chunks {
            match chunk.chunk_type {
                ChunkType::Module => self.modules += 1,
                ChunkType::Function => self.functions += 1,
                ChunkType::Class => self.classes += 1,
            }
        }
    }
}

impl std::fmt::Display for ChunkingStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Files: {} | Chunks: {} | Modules: {} | Functions: {} | Classes: {} | Degraded: {}",
            self.files,
            self.total_chunks,
            self.modules,
            self.functions,
            self.classes,
            self.degraded_files
        )
    }
}
