use crate::language::Language;
use serde::{Deserialize, Serialize};

/// One source file as handed over by the ingestion stage
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IngestedFile {
    pub path: String,

    #[serde(default)]
    pub content: String,

    /// Character count of `content`
    #[serde(default)]
    pub size: usize,

    /// Guessed MIME type, if any
    #[serde(rename = "type", alias = "mime_type", default)]
    pub mime_type: Option<String>,
}

impl IngestedFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let content = content.into();
        Self {
            path: path.into(),
            size: content.chars().count(),
            content,
            mime_type: None,
        }
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: Option<String>) -> Self {
        self.mime_type = mime_type;
        self
    }
}

/// A semantic code chunk.
///
/// Field names and order are the wire format read by the embedding stage.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CodeChunk {
    /// sha1 of `"{file_path}:{name}:{start_line}:{end_line}"`
    pub id: String,

    pub file_path: String,

    pub language: Language,

    #[serde(rename = "type")]
    pub chunk_type: ChunkType,

    /// Declaration name; `None` for module chunks
    #[serde(default)]
    pub name: Option<String>,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    /// Lines of code, never below 1
    pub loc: usize,

    /// Character length of `code`
    pub size: usize,

    /// Branch-count estimate, Python only
    #[serde(default)]
    pub complexity: Option<u32>,

    /// Import references of the whole file, shared by every chunk of that file
    #[serde(default)]
    pub imports: Vec<String>,

    #[serde(default)]
    pub docstring: Option<String>,

    pub code: String,
}

impl CodeChunk {
    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    #[must_use]
    pub const fn is_declaration(&self) -> bool {
        !matches!(self.chunk_type, ChunkType::Module)
    }
}

/// Kind of unit a chunk represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkType {
    /// Residual module-level code, or a whole file
    Module,
    /// Top-level function or async function
    Function,
    /// Top-level class
    Class,
}

impl ChunkType {
    /// Get human-readable name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Module => "module",
            Self::Function => "function",
            Self::Class => "class",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn ingested_file_counts_characters() {
        let file = IngestedFile::new("a.py", "é = 1\n");
        assert_eq!(file.size, 6);
        assert!(file.mime_type.is_none());
    }

    #[test]
    fn ingested_file_reads_type_key() {
        let file: IngestedFile = serde_json::from_str(
            r#"{"path":"x.js","content":"let a;","size":6,"type":"text/javascript"}"#,
        )
        .unwrap();
        assert_eq!(file.mime_type.as_deref(), Some("text/javascript"));

        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["type"], "text/javascript");
    }

    #[test]
    fn chunk_serializes_wire_field_names() {
        let chunk = CodeChunk {
            id: "abc".into(),
            file_path: "a.py".into(),
            language: Language::Python,
            chunk_type: ChunkType::Function,
            name: Some("f".into()),
            start_line: 3,
            end_line: 4,
            loc: 2,
            size: 21,
            complexity: Some(1),
            imports: vec!["os".into()],
            docstring: None,
            code: "def f():\n    return 1".into(),
        };

        let value = serde_json::to_value(&chunk).unwrap();
        let keys: Vec<&str> = value
            .as_object()
            .unwrap()
            .keys()
            .map(String::as_str)
            .collect();
        let mut expected = vec![
            "id",
            "file_path",
            "language",
            "type",
            "name",
            "start_line",
            "end_line",
            "loc",
            "size",
            "complexity",
            "imports",
            "docstring",
            "code",
        ];
        let mut keys_sorted = keys.clone();
        keys_sorted.sort_unstable();
        expected.sort_unstable();
        assert_eq!(keys_sorted, expected);
        assert_eq!(value["type"], "function");
        assert_eq!(value["language"], "python");
        assert!(value["docstring"].is_null());
    }

    #[test]
    fn chunk_tolerates_absent_optional_fields() {
        let chunk: CodeChunk = serde_json::from_str(
            r#"{"id":"x","file_path":"a.rb","language":"ruby","type":"module",
                "start_line":1,"end_line":1,"loc":1,"size":0,"code":""}"#,
        )
        .unwrap();
        assert!(chunk.name.is_none());
        assert!(chunk.complexity.is_none());
        assert!(chunk.imports.is_empty());
        assert!(!chunk.is_declaration());
        assert!(chunk.contains_line(1));
    }
}
