use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Language tag attached to every chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    TypeScript,
    Java,
    Cpp,
    C,
    Go,
    Ruby,
    Php,
    Unknown,
}

/// Which parser variant handles a language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserKind {
    /// Real syntax tree, one chunk per top-level declaration
    Python,
    /// Whole file as one chunk, imports by pattern
    Generic,
}

impl Language {
    /// Detect language from file extension (case-insensitive, without the dot)
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "py" => Language::Python,
            "js" => Language::JavaScript,
            "ts" => Language::TypeScript,
            "java" => Language::Java,
            "cpp" => Language::Cpp,
            "c" => Language::C,
            "go" => Language::Go,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path. Total: anything without a known
    /// extension is `Unknown`.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub const fn as_str(self) -> &'static str {
        match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Unknown => "unknown",
        }
    }

    /// Parser variant for this language
    pub const fn parser_kind(self) -> ParserKind {
        match self {
            Language::Python => ParserKind::Python,
            _ => ParserKind::Generic,
        }
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::Python => Ok(tree_sitter_python::LANGUAGE.into()),
            _ => Err(ChunkerError::tree_sitter(format!(
                "no grammar bundled for {}",
                self.as_str()
            ))),
        }
    }

    /// Build a parser already set to this language's grammar
    pub fn tree_sitter_parser(self) -> Result<tree_sitter::Parser> {
        let grammar = self.tree_sitter_language()?;
        let mut parser = tree_sitter::Parser::new();
        parser
            .set_language(&grammar)
            .map_err(|e| ChunkerError::tree_sitter(format!("Failed to set language: {e}")))?;
        Ok(parser)
    }

    /// Whether import heuristics should use the ES-module/CommonJS patterns
    pub const fn is_js_family(self) -> bool {
        matches!(self, Language::JavaScript | Language::TypeScript)
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("ts"), Language::TypeScript);
        assert_eq!(Language::from_extension("Cpp"), Language::Cpp);
        assert_eq!(Language::from_extension("rb"), Language::Ruby);
        assert_eq!(Language::from_extension("rs"), Language::Unknown);
        assert_eq!(Language::from_extension(""), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("src/main.py"), Language::Python);
        assert_eq!(Language::from_path("lib/App.JAVA"), Language::Java);
        assert_eq!(Language::from_path("index.ts"), Language::TypeScript);
        assert_eq!(Language::from_path("Makefile"), Language::Unknown);
        assert_eq!(Language::from_path(".py"), Language::Unknown);
        assert_eq!(Language::from_path("archive.tar.gz"), Language::Unknown);
    }

    #[test]
    fn only_python_takes_the_deep_path() {
        assert_eq!(Language::Python.parser_kind(), ParserKind::Python);
        assert_eq!(Language::Go.parser_kind(), ParserKind::Generic);
        assert_eq!(Language::Unknown.parser_kind(), ParserKind::Generic);
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::Python.tree_sitter_parser().is_ok());
        assert!(Language::Ruby.tree_sitter_language().is_err());
    }

    #[test]
    fn serializes_as_lowercase_tag() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");
        assert_eq!(Language::Php.to_string(), "php");
    }
}
