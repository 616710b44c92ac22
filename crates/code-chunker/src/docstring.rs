//! Docstring literal decoding.
//!
//! A docstring is the first statement of a module, function or class body when
//! that statement is a plain (non-f, non-bytes) string literal, possibly made of
//! implicitly concatenated parts. The stored value is the decoded literal with
//! common indentation removed and blank edge lines dropped.

use tree_sitter::Node;

const TAB_SIZE: usize = 8;

/// Docstring of a `module` or `block` node, if it has one
pub fn body_docstring(body: Node, source: &[u8]) -> Option<String> {
    let mut cursor = body.walk();
    let first = body
        .named_children(&mut cursor)
        .find(|child| child.kind() != "comment")?;
    if first.kind() != "expression_statement" || first.named_child_count() != 1 {
        return None;
    }
    let literal = first.named_child(0)?;
    let raw = string_value(literal, source)?;
    Some(clean(&raw))
}

/// Decoded value of a `string` or `concatenated_string` node
fn string_value(node: Node, source: &[u8]) -> Option<String> {
    match node.kind() {
        "string" => single_string_value(node, source),
        "concatenated_string" => {
            let mut cursor = node.walk();
            let parts: Option<Vec<String>> = node
                .named_children(&mut cursor)
                .filter(|part| part.kind() != "comment")
                .map(|part| single_string_value(part, source))
                .collect();
            parts.map(|parts| parts.concat())
        }
        _ => None,
    }
}

fn single_string_value(node: Node, source: &[u8]) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    let mut cursor = node.walk();
    let mut start = None;
    let mut end = None;
    for child in node.children(&mut cursor) {
        match child.kind() {
            "string_start" => start = Some(child),
            "string_end" => end = Some(child),
            "interpolation" => return None,
            _ => {}
        }
    }
    let (start, end) = (start?, end?);

    let opener = start.utf8_text(source).ok()?;
    let prefix = opener
        .trim_end_matches(['"', '\''])
        .to_ascii_lowercase();
    if prefix.contains('f') || prefix.contains('b') {
        return None;
    }

    let body = std::str::from_utf8(source.get(start.end_byte()..end.start_byte())?).ok()?;
    if prefix.contains('r') {
        Some(body.to_string())
    } else {
        Some(unescape(body))
    }
}

/// Resolve backslash escapes of a non-raw string literal
pub fn unescape(body: &str) -> String {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        let Some(next) = chars.next() else {
            out.push('\\');
            break;
        };
        match next {
            '\n' => {}
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                }
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\u{07}'),
            'b' => out.push('\u{08}'),
            'f' => out.push('\u{0c}'),
            'v' => out.push('\u{0b}'),
            '0'..='7' => {
                let mut digits = String::from(next);
                while digits.len() < 3 {
                    match chars.peek() {
                        Some(d @ '0'..='7') => {
                            digits.push(*d);
                            chars.next();
                        }
                        _ => break,
                    }
                }
                match u32::from_str_radix(&digits, 8).ok().and_then(char::from_u32) {
                    Some(decoded) => out.push(decoded),
                    None => {
                        out.push('\\');
                        out.push_str(&digits);
                    }
                }
            }
            'x' | 'u' | 'U' => {
                let width = match next {
                    'x' => 2,
                    'u' => 4,
                    _ => 8,
                };
                let digits: String = chars.clone().take(width).collect();
                let decoded = (digits.len() == width
                    && digits.chars().all(|d| d.is_ascii_hexdigit()))
                .then(|| u32::from_str_radix(&digits, 16).ok())
                .flatten()
                .and_then(char::from_u32);
                match decoded {
                    Some(decoded) => {
                        out.push(decoded);
                        for _ in 0..width {
                            chars.next();
                        }
                    }
                    None => {
                        out.push('\\');
                        out.push(next);
                    }
                }
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    out
}

/// Normalize docstring indentation: expand tabs, strip the first line, remove
/// the common margin of the remaining lines, drop blank leading and trailing
/// lines.
pub fn clean(doc: &str) -> String {
    let mut lines: Vec<String> = doc.split('\n').map(expand_tabs).collect();

    let margin = lines
        .iter()
        .skip(1)
        .filter(|line| !line.trim_start().is_empty())
        .map(|line| line.chars().count() - line.trim_start().chars().count())
        .min();

    if let Some(first) = lines.first_mut() {
        *first = first.trim_start().to_string();
    }
    if let Some(margin) = margin {
        for line in lines.iter_mut().skip(1) {
            *line = line.chars().skip(margin).collect();
        }
    }

    while lines.last().is_some_and(String::is_empty) {
        lines.pop();
    }
    let leading = lines.iter().take_while(|line| line.is_empty()).count();
    lines.drain(..leading);

    lines.join("\n")
}

fn expand_tabs(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut column = 0;
    for c in line.chars() {
        match c {
            '\t' => {
                let pad = TAB_SIZE - column % TAB_SIZE;
                out.extend(std::iter::repeat(' ').take(pad));
                column += pad;
            }
            '\r' => {
                out.push(c);
                column = 0;
            }
            _ => {
                out.push(c);
                column += 1;
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::Language;
    use pretty_assertions::assert_eq;

    fn module_doc(code: &str) -> Option<String> {
        let mut parser = Language::Python.tree_sitter_parser().unwrap();
        let tree = parser.parse(code, None).unwrap();
        body_docstring(tree.root_node(), code.as_bytes())
    }

    #[test]
    fn reads_triple_quoted_docstring() {
        let code = "\"\"\"\n    Summary line.\n\n    Details here.\n    \"\"\"\nx = 1\n";
        assert_eq!(
            module_doc(code).as_deref(),
            Some("Summary line.\n\nDetails here.")
        );
    }

    #[test]
    fn skips_leading_comments() {
        let code = "# header\n'doc'\n";
        assert_eq!(module_doc(code).as_deref(), Some("doc"));
    }

    #[test]
    fn non_string_first_statement_has_no_docstring() {
        assert_eq!(module_doc("x = 'doc'\n"), None);
        assert_eq!(module_doc(""), None);
    }

    #[test]
    fn f_strings_and_bytes_are_not_docstrings() {
        assert_eq!(module_doc("f'doc {x}'\n"), None);
        assert_eq!(module_doc("b'doc'\n"), None);
    }

    #[test]
    fn raw_strings_keep_backslashes() {
        assert_eq!(module_doc("r'a\\nb'\n").as_deref(), Some("a\\nb"));
        assert_eq!(module_doc("'a\\tb'\n").as_deref(), Some("a       b"));
    }

    #[test]
    fn concatenated_parts_are_joined() {
        assert_eq!(module_doc("'abc' \"def\"\n").as_deref(), Some("abcdef"));
    }

    #[test]
    fn unescape_handles_common_sequences() {
        assert_eq!(unescape(r"a\nb"), "a\nb");
        assert_eq!(unescape(r"\x41é\101"), "AéA");
        assert_eq!(unescape(r"keep \q"), "keep \\q");
        assert_eq!(unescape("line\\\ncontinued"), "linecontinued");
        assert_eq!(unescape(r"bad \xZZ"), "bad \\xZZ");
    }

    #[test]
    fn clean_removes_common_margin() {
        assert_eq!(clean("  first\n      a\n        b\n"), "first\na\n  b");
        assert_eq!(clean("\n\n  only\n\n"), "only");
    }
}
