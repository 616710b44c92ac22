use crate::builder::{ChunkBuilder, ChunkDraft};
use crate::chunker::{SourceParser, Walk};
use crate::docstring::body_docstring;
use crate::error::Result;
use crate::language::Language;
use crate::segment::{extract_segment, LineSpan};
use crate::types::ChunkType;
use std::collections::VecDeque;
use std::ops::Range;
use tree_sitter::{Node, Parser, Tree};

/// Result of handing a file to the Python grammar
pub enum ParseOutcome {
    Parsed(Tree),
    Unparseable(String),
}

/// Python declaration walker.
///
/// Emits one chunk per top-level function, async function and class, plus a
/// leading module chunk for whatever code lies outside those declarations.
/// Nested definitions stay inside their parent's chunk.
pub struct PythonWalker {
    parser: Parser,
}

/// A top-level `def`/`class`, decorators included
#[derive(Debug, Clone)]
pub(crate) struct Declaration {
    pub kind: ChunkType,
    pub name: Option<String>,
    pub span: LineSpan,
    pub bytes: Range<usize>,
    pub docstring: Option<String>,
}

/// Lines of a file not covered by any top-level declaration
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ModuleResidual {
    pub code: String,
    /// 1-based numbers of the kept lines
    pub lines: Vec<usize>,
}

impl PythonWalker {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: Language::Python.tree_sitter_parser()?,
        })
    }

    /// Parse `content`, reporting the first syntax error instead of a partial tree.
    ///
    /// The grammar also accepts Python 2 `print`/`exec` statements; those are
    /// syntax errors in Python 3 and are reported the same way.
    pub fn parse(&mut self, content: &str) -> ParseOutcome {
        let Some(tree) = self.parser.parse(content, None) else {
            return ParseOutcome::Unparseable("parser produced no tree".to_string());
        };
        let root = tree.root_node();
        if root.has_error() {
            return ParseOutcome::Unparseable(describe_syntax_error(root));
        }
        if let Some(node) = python2_statement(root) {
            let pos = node.start_position();
            return ParseOutcome::Unparseable(format!(
                "Python 2 `{}` statement at line {}, column {}",
                node.kind().trim_end_matches("_statement"),
                pos.row + 1,
                pos.column + 1
            ));
        }
        ParseOutcome::Parsed(tree)
    }

    pub fn walk(&mut self, builder: &mut ChunkBuilder, path: &str, content: &str) -> Walk {
        let tree = match self.parse(content) {
            ParseOutcome::Parsed(tree) => tree,
            ParseOutcome::Unparseable(reason) => {
                log::warn!("Syntax error parsing {path}: {reason}; keeping whole file as one chunk");
                let chunk = builder.build(
                    ChunkDraft::new(path, ChunkType::Module, content, Language::Python)
                        .lines(Some(1), None),
                );
                return Walk {
                    chunks: vec![chunk],
                    degraded: Some(reason),
                };
            }
        };

        let source = content.as_bytes();
        let root = tree.root_node();
        let imports = collect_imports(root, source);
        let declarations = top_level_declarations(root, source);
        let module_doc = body_docstring(root, source);

        let mut chunks = Vec::with_capacity(declarations.len() + 1);

        let residual = module_residual(content, &declarations);
        if !residual.code.trim().is_empty() {
            chunks.push(builder.build(
                ChunkDraft::new(path, ChunkType::Module, residual.code, Language::Python)
                    .lines(Some(1), None)
                    .imports(imports.clone())
                    .docstring(module_doc.clone()),
            ));
        }

        for decl in &declarations {
            let code = extract_segment(content, Some(decl.bytes.clone()), decl.span);
            chunks.push(builder.build(
                ChunkDraft::new(path, decl.kind, code, Language::Python)
                    .name(decl.name.clone())
                    .lines(Some(decl.span.start), Some(decl.span.end_line()))
                    .imports(imports.clone())
                    .docstring(decl.docstring.clone()),
            ));
        }

        // Blank files still yield one chunk.
        if chunks.is_empty() {
            chunks.push(builder.build(
                ChunkDraft::new(path, ChunkType::Module, content, Language::Python)
                    .lines(Some(1), None)
                    .imports(imports)
                    .docstring(module_doc),
            ));
        }

        log::debug!(
            "{path}: {} declarations, {} chunks",
            declarations.len(),
            chunks.len()
        );

        Walk {
            chunks,
            degraded: None,
        }
    }
}

impl SourceParser for PythonWalker {
    fn parse(&mut self, builder: &mut ChunkBuilder, path: &str, content: &str) -> Walk {
        self.walk(builder, path, content)
    }
}

/// First statement only Python 2 accepts, in source order
pub(crate) fn python2_statement(root: Node) -> Option<Node> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if matches!(node.kind(), "print_statement" | "exec_statement") {
            return Some(node);
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

fn describe_syntax_error(root: Node) -> String {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            let pos = node.start_position();
            let what = if node.is_missing() {
                format!("missing `{}`", node.kind())
            } else {
                "invalid syntax".to_string()
            };
            return format!("{what} at line {}, column {}", pos.row + 1, pos.column + 1);
        }
        if !node.has_error() {
            continue;
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        // Reverse so the earliest error is popped first.
        stack.extend(children.into_iter().rev());
    }
    "invalid syntax".to_string()
}

/// Every import in the file, breadth-first.
///
/// `from X import Y` yields `X.Y`; relative imports drop their leading dots and
/// yield bare `Y` when no module follows them.
pub(crate) fn collect_imports(root: Node, source: &[u8]) -> Vec<String> {
    let mut imports = Vec::new();
    let mut queue = VecDeque::from([root]);

    while let Some(node) = queue.pop_front() {
        match node.kind() {
            "import_statement" => {
                let mut cursor = node.walk();
                for name in node.children_by_field_name("name", &mut cursor) {
                    if let Some(name) = imported_name(name, source) {
                        imports.push(name);
                    }
                }
            }
            "import_from_statement" | "future_import_statement" => {
                let module = if node.kind() == "future_import_statement" {
                    "__future__".to_string()
                } else {
                    node.child_by_field_name("module_name")
                        .map(|module| module_path(module, source))
                        .unwrap_or_default()
                };
                for name in from_import_names(node, source) {
                    if module.is_empty() {
                        imports.push(name);
                    } else {
                        imports.push(format!("{module}.{name}"));
                    }
                }
            }
            _ => enqueue_children(node, &mut queue),
        }
    }

    imports
}

/// Queue statement-level children. `block` and `decorated_definition` are
/// flattened so depth follows statement nesting rather than grammar wrappers.
fn enqueue_children<'tree>(node: Node<'tree>, queue: &mut VecDeque<Node<'tree>>) {
    let mut cursor = node.walk();
    for child in node.named_children(&mut cursor) {
        if matches!(child.kind(), "block" | "decorated_definition") {
            enqueue_children(child, queue);
        } else {
            queue.push_back(child);
        }
    }
}

fn from_import_names(node: Node, source: &[u8]) -> Vec<String> {
    let mut names = Vec::new();
    let mut cursor = node.walk();
    for name in node.children_by_field_name("name", &mut cursor) {
        if let Some(name) = imported_name(name, source) {
            names.push(name);
        }
    }
    let mut cursor = node.walk();
    if node
        .named_children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import")
    {
        names.push("*".to_string());
    }
    names
}

fn imported_name(node: Node, source: &[u8]) -> Option<String> {
    let target = match node.kind() {
        "aliased_import" => node.child_by_field_name("name")?,
        _ => node,
    };
    let text = target.utf8_text(source).ok()?;
    let name: String = text.split_whitespace().collect();
    (!name.is_empty()).then_some(name)
}

fn module_path(node: Node, source: &[u8]) -> String {
    let target = if node.kind() == "relative_import" {
        let mut cursor = node.walk();
        let dotted = node
            .named_children(&mut cursor)
            .find(|child| child.kind() == "dotted_name");
        match dotted {
            Some(dotted) => dotted,
            None => return String::new(),
        }
    } else {
        node
    };
    target
        .utf8_text(source)
        .map(|text| text.split_whitespace().collect())
        .unwrap_or_default()
}

pub(crate) fn top_level_declarations(root: Node, source: &[u8]) -> Vec<Declaration> {
    let mut declarations = Vec::new();
    let mut cursor = root.walk();

    for child in root.named_children(&mut cursor) {
        let definition = match child.kind() {
            "function_definition" | "class_definition" => child,
            "decorated_definition" => match child.child_by_field_name("definition") {
                Some(definition) => definition,
                None => continue,
            },
            _ => continue,
        };

        let kind = match definition.kind() {
            "class_definition" => ChunkType::Class,
            "function_definition" => ChunkType::Function,
            _ => continue,
        };

        let name = definition
            .child_by_field_name("name")
            .and_then(|name| name.utf8_text(source).ok())
            .map(str::to_string);
        let docstring = definition
            .child_by_field_name("body")
            .and_then(|body| body_docstring(body, source));

        declarations.push(Declaration {
            kind,
            name,
            span: LineSpan::new(child.start_position().row + 1, Some(last_line(child))),
            bytes: child.start_byte()..code_end(child).end_byte(),
            docstring,
        });
    }

    declarations
}

/// Last descendant of `node` that is not a trailing comment.
///
/// A block keeps comments indented after its last statement; they are not
/// part of the declaration and fall to the module residual instead.
fn code_end(node: Node) -> Node {
    let mut current = node;
    loop {
        let mut cursor = current.walk();
        let last = current
            .children(&mut cursor)
            .filter(|child| child.kind() != "comment")
            .last();
        match last {
            Some(child) => current = child,
            None => return current,
        }
    }
}

/// 1-based last line holding code of `node`
fn last_line(node: Node) -> usize {
    let start = node.start_position();
    let end = code_end(node).end_position();
    if end.column == 0 && end.row > start.row {
        end.row
    } else {
        end.row + 1
    }
}

pub(crate) fn module_residual(content: &str, declarations: &[Declaration]) -> ModuleResidual {
    let mut kept = Vec::new();
    let mut lines = Vec::new();
    for (index, line) in content.lines().enumerate() {
        if declarations.iter().any(|decl| decl.span.contains_index(index)) {
            continue;
        }
        kept.push(line);
        lines.push(index + 1);
    }
    ModuleResidual {
        code: kept.join("\n"),
        lines,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn walk(path: &str, content: &str) -> Walk {
        let mut builder = ChunkBuilder::new().unwrap();
        PythonWalker::new().unwrap().walk(&mut builder, path, content)
    }

    fn imports_of(content: &str) -> Vec<String> {
        let mut walker = PythonWalker::new().unwrap();
        let ParseOutcome::Parsed(tree) = walker.parse(content) else {
            panic!("expected valid python");
        };
        collect_imports(tree.root_node(), content.as_bytes())
    }

    fn declarations_of(content: &str) -> Vec<Declaration> {
        let mut walker = PythonWalker::new().unwrap();
        let ParseOutcome::Parsed(tree) = walker.parse(content) else {
            panic!("expected valid python");
        };
        top_level_declarations(tree.root_node(), content.as_bytes())
    }

    #[test]
    fn splits_module_and_function() {
        let out = walk("a.py", "import os\n\ndef f():\n    return 1\n");
        assert!(out.degraded.is_none());
        assert_eq!(out.chunks.len(), 2);

        let module = &out.chunks[0];
        assert_eq!(module.chunk_type, ChunkType::Module);
        assert_eq!(module.name, None);
        assert_eq!(module.code, "import os\n");
        assert_eq!(module.imports, vec!["os".to_string()]);
        assert_eq!((module.start_line, module.end_line), (1, 2));

        let function = &out.chunks[1];
        assert_eq!(function.chunk_type, ChunkType::Function);
        assert_eq!(function.name.as_deref(), Some("f"));
        assert_eq!((function.start_line, function.end_line), (3, 4));
        assert_eq!(function.loc, 2);
        assert_eq!(function.complexity, Some(1));
        assert_eq!(function.code, "def f():\n    return 1");
        assert_eq!(function.imports, module.imports);
    }

    #[test]
    fn import_forms() {
        let code = r#"
import os, os.path as osp
from collections import OrderedDict, defaultdict as dd
from . import sibling
from ..pkg.sub import thing
from typing import *
from __future__ import annotations
"#;
        assert_eq!(
            imports_of(code),
            vec![
                "os",
                "os.path",
                "collections.OrderedDict",
                "collections.defaultdict",
                "sibling",
                "pkg.sub.thing",
                "typing.*",
                "__future__.annotations",
            ]
        );
    }

    #[test]
    fn imports_are_breadth_first_and_file_wide() {
        let code = r#"
def f():
    import json
    if True:
        import csv

import os

class C:
    import re
"#;
        assert_eq!(imports_of(code), vec!["os", "json", "re", "csv"]);
    }

    #[test]
    fn duplicate_imports_are_kept() {
        assert_eq!(imports_of("import os\nimport os\n"), vec!["os", "os"]);
    }

    #[test]
    fn async_and_decorated_declarations() {
        let code = "@cache\nasync def fetch():\n    '''Get it.'''\n    return 1\n\nclass K(Base):\n    \"\"\"A class.\"\"\"\n    def m(self):\n        pass\n";
        let decls = declarations_of(code);
        assert_eq!(decls.len(), 2);

        assert_eq!(decls[0].kind, ChunkType::Function);
        assert_eq!(decls[0].name.as_deref(), Some("fetch"));
        assert_eq!((decls[0].span.start, decls[0].span.end_line()), (1, 4));
        assert_eq!(decls[0].docstring.as_deref(), Some("Get it."));

        assert_eq!(decls[1].kind, ChunkType::Class);
        assert_eq!(decls[1].name.as_deref(), Some("K"));
        assert_eq!((decls[1].span.start, decls[1].span.end_line()), (6, 9));
        assert_eq!(decls[1].docstring.as_deref(), Some("A class."));
    }

    #[test]
    fn decorators_stay_with_their_declaration() {
        let out = walk("d.py", "@app.route('/')\ndef index():\n    return 'hi'\n");
        assert_eq!(out.chunks.len(), 1);
        assert!(out.chunks[0].code.starts_with("@app.route('/')"));
        assert_eq!(out.chunks[0].start_line, 1);
    }

    #[test]
    fn nested_definitions_are_not_chunked() {
        let code = "def outer():\n    def inner():\n        pass\n    return inner\n";
        let out = walk("n.py", code);
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].name.as_deref(), Some("outer"));
        assert!(out.chunks[0].code.contains("def inner"));
    }

    #[test]
    fn module_chunk_uses_module_docstring() {
        let code = "\"\"\"Tools.\"\"\"\nX = 1\n\ndef f():\n    \"\"\"Eff.\"\"\"\n";
        let out = walk("m.py", code);
        assert_eq!(out.chunks[0].docstring.as_deref(), Some("Tools."));
        assert_eq!(out.chunks[1].docstring.as_deref(), Some("Eff."));
    }

    #[test]
    fn residual_is_the_complement_of_declarations() {
        let code = "import os\n\ndef a():\n    pass\n\nX = 1\n\nclass B:\n    pass\nmain()\n";
        let decls = declarations_of(code);
        let residual = module_residual(code, &decls);
        assert_eq!(residual.lines, vec![1, 2, 5, 6, 7, 10]);
        assert_eq!(residual.code, "import os\n\n\nX = 1\n\nmain()");
    }

    #[test]
    fn syntax_error_degrades_to_whole_file() {
        let code = "import os\ndef broken(:\n    pass\n";
        let out = walk("bad.py", code);
        assert!(out.degraded.as_deref().is_some_and(|r| r.contains("line")));
        assert_eq!(out.chunks.len(), 1);

        let chunk = &out.chunks[0];
        assert_eq!(chunk.chunk_type, ChunkType::Module);
        assert_eq!(chunk.code, code);
        assert!(chunk.imports.is_empty());
        assert!(chunk.docstring.is_none());
        assert_eq!(chunk.complexity, Some(1));
    }

    #[test]
    fn blank_file_still_yields_a_chunk() {
        let out = walk("empty.py", "");
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].code, "");
        assert_eq!(out.chunks[0].loc, 1);

        let out = walk("comments.py", "# nothing here\n");
        assert_eq!(out.chunks.len(), 1);
        assert_eq!(out.chunks[0].chunk_type, ChunkType::Module);
    }

    #[test]
    fn python2_statements_degrade_to_whole_file() {
        let code = "import os\nprint \"hello\"\n\ndef f():\n    return 1\n";
        let out = walk("legacy.py", code);
        assert!(out
            .degraded
            .as_deref()
            .is_some_and(|r| r.contains("`print` statement at line 2")));
        assert_eq!(out.chunks.len(), 1);

        let chunk = &out.chunks[0];
        assert_eq!(chunk.chunk_type, ChunkType::Module);
        assert_eq!(chunk.code, code);
        assert!(chunk.imports.is_empty());
        assert_eq!(chunk.complexity, Some(1));

        let out = walk("legacy_exec.py", "exec \"x = 1\"\n");
        assert!(out.degraded.as_deref().is_some_and(|r| r.contains("`exec`")));
        assert_eq!(out.chunks.len(), 1);
    }

    #[test]
    fn print_calls_are_python3() {
        let out = walk("p3.py", "print(\"hello\")\n\ndef f():\n    print(1)\n");
        assert!(out.degraded.is_none());
        assert_eq!(out.chunks.len(), 2);
    }

    #[test]
    fn trailing_block_comments_fall_to_the_module() {
        let code = "def f():\n    return 1\n    # trailing note\n";
        let out = walk("c.py", code);
        assert_eq!(out.chunks.len(), 2);

        let module = &out.chunks[0];
        assert_eq!(module.chunk_type, ChunkType::Module);
        assert_eq!(module.code, "    # trailing note");

        let function = &out.chunks[1];
        assert_eq!((function.start_line, function.end_line), (1, 2));
        assert_eq!(function.code, "def f():\n    return 1");
    }

    #[test]
    fn nested_trailing_comments_end_at_last_statement() {
        let code = "def f(x):\n    if x:\n        return 1\n        # inner\n    # outer\n\nY = 2\n";
        let decls = declarations_of(code);
        assert_eq!((decls[0].span.start, decls[0].span.end_line()), (1, 3));

        let residual = module_residual(code, &decls);
        assert_eq!(residual.lines, vec![4, 5, 6, 7]);
    }
}
