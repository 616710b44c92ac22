use crate::complexity::ComplexityEstimator;
use crate::error::Result;
use crate::language::Language;
use crate::types::{ChunkType, CodeChunk};
use sha1::{Digest, Sha1};

/// Stands in for an absent name inside the id hash input
pub const ABSENT_NAME: &str = "None";

/// Raw parts of a chunk before ids and derived sizes are assigned
#[derive(Debug, Clone)]
pub struct ChunkDraft {
    pub file_path: String,
    pub chunk_type: ChunkType,
    pub name: Option<String>,
    pub start_line: Option<usize>,
    pub end_line: Option<usize>,
    pub code: String,
    pub imports: Vec<String>,
    pub docstring: Option<String>,
    pub language: Language,
}

impl ChunkDraft {
    pub fn new(
        file_path: impl Into<String>,
        chunk_type: ChunkType,
        code: impl Into<String>,
        language: Language,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            chunk_type,
            name: None,
            start_line: None,
            end_line: None,
            code: code.into(),
            imports: Vec::new(),
            docstring: None,
            language,
        }
    }

    /// Builder: set declaration name
    #[must_use]
    pub fn name(mut self, name: Option<String>) -> Self {
        self.name = name;
        self
    }

    /// Builder: set line bounds; `None` end is estimated from the code
    #[must_use]
    pub fn lines(mut self, start: Option<usize>, end: Option<usize>) -> Self {
        self.start_line = start;
        self.end_line = end;
        self
    }

    /// Builder: set file-wide imports
    #[must_use]
    pub fn imports(mut self, imports: Vec<String>) -> Self {
        self.imports = imports;
        self
    }

    /// Builder: set docstring
    #[must_use]
    pub fn docstring(mut self, docstring: Option<String>) -> Self {
        self.docstring = docstring;
        self
    }
}

/// Turns drafts into finished [`CodeChunk`]s
pub struct ChunkBuilder {
    complexity: ComplexityEstimator,
}

impl ChunkBuilder {
    pub fn new() -> Result<Self> {
        Ok(Self {
            complexity: ComplexityEstimator::new()?,
        })
    }

    pub fn build(&mut self, draft: ChunkDraft) -> CodeChunk {
        let start_line = draft.start_line.filter(|&line| line > 0).unwrap_or(1);
        let end_line = draft
            .end_line
            .unwrap_or_else(|| start_line + draft.code.matches('\n').count());
        let loc = (end_line + 1).saturating_sub(start_line).max(1);
        let size = draft.code.chars().count();
        let complexity =
            (draft.language == Language::Python).then(|| self.complexity.estimate(&draft.code));
        let id = chunk_id(&draft.file_path, draft.name.as_deref(), start_line, end_line);

        CodeChunk {
            id,
            file_path: draft.file_path,
            language: draft.language,
            chunk_type: draft.chunk_type,
            name: draft.name,
            start_line,
            end_line,
            loc,
            size,
            complexity,
            imports: draft.imports,
            docstring: draft.docstring,
            code: draft.code,
        }
    }
}

/// Deterministic chunk id: hex sha1 of `"{path}:{name}:{start}:{end}"`
pub fn chunk_id(path: &str, name: Option<&str>, start_line: usize, end_line: usize) -> String {
    let name = name.unwrap_or(ABSENT_NAME);
    let mut hasher = Sha1::new();
    hasher.update(format!("{path}:{name}:{start_line}:{end_line}").as_bytes());
    hex::encode(hasher.finalize())
}
