use crate::builder::{ChunkBuilder, ChunkDraft};
use crate::chunker::{SourceParser, Walk};
use crate::language::Language;
use crate::types::ChunkType;
use once_cell::sync::Lazy;
use regex::Regex;

/// ES-module `import ... from "x"` or CommonJS `const x = require("x")`
static JS_IMPORT: Lazy<Regex> = Lazy::new(|| {
    compile_regex(r#"^\s*(?:import .* from ['"]([^'"]+)['"]|const .* = require\(['"]([^'"]+)['"]\))"#)
});

/// `import x`, `require "x"`, `using x;`, optionally behind a comment marker
static GENERIC_IMPORT: Lazy<Regex> =
    Lazy::new(|| compile_regex(r#"^\s*(?:#|//)?\s*(?:import|require|using)\s+['"]?([^\s;'"]+)"#));

fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

/// Whole-file parser for languages without a syntax-tree path.
///
/// Import detection is a line-by-line heuristic. It misses multi-line import
/// lists and can pick up matching lines inside strings or comments.
pub struct GenericParser {
    language: Language,
}

impl GenericParser {
    pub const fn new(language: Language) -> Self {
        Self { language }
    }

    pub fn imports(&self, content: &str) -> Vec<String> {
        extract_imports(self.language, content)
    }
}

impl SourceParser for GenericParser {
    fn parse(&mut self, builder: &mut ChunkBuilder, path: &str, content: &str) -> Walk {
        let imports = self.imports(content);
        let chunk = builder.build(
            ChunkDraft::new(path, ChunkType::Module, content, self.language)
                .lines(Some(1), None)
                .imports(imports),
        );
        Walk {
            chunks: vec![chunk],
            degraded: None,
        }
    }
}

pub fn extract_imports(language: Language, content: &str) -> Vec<String> {
    let pattern: &Regex = if language.is_js_family() {
        &JS_IMPORT
    } else {
        &GENERIC_IMPORT
    };

    content
        .lines()
        .filter_map(|line| pattern.captures(line))
        .flat_map(|caps| {
            caps.iter()
                .skip(1)
                .flatten()
                .map(|m| m.as_str().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|import| !import.is_empty())
        .collect()
}
