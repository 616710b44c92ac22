use crate::error::Result;
use crate::language::Language;
use crate::python::python2_statement;
use tree_sitter::{Node, Parser};

/// Baseline score, also returned for code that does not parse
pub const BASE_COMPLEXITY: u32 = 1;

/// McCabe-style branch counter for Python snippets.
///
/// Starts at 1 and adds one per conditional, loop (async loops included),
/// conditional expression, `try` and `except` clause. Boolean operators add
/// one per extra operand; the grammar nests `a and b and c` as two binary
/// nodes, so counting one per node gives the same `k - 1` total.
///
/// This is an approximation: `match` arms and lambda boundaries are ignored.
pub struct ComplexityEstimator {
    parser: Parser,
}

impl ComplexityEstimator {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: Language::Python.tree_sitter_parser()?,
        })
    }

    /// Score `code` parsed as a standalone module
    pub fn estimate(&mut self, code: &str) -> u32 {
        let Some(tree) = self.parser.parse(code, None) else {
            return BASE_COMPLEXITY;
        };
        let root = tree.root_node();
        if root.has_error() || python2_statement(root).is_some() {
            return BASE_COMPLEXITY;
        }
        BASE_COMPLEXITY + count_branches(root)
    }
}

fn count_branches(root: Node) -> u32 {
    let mut count = 0;
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if is_branch(node.kind()) {
            count += 1;
        }
        let mut cursor = node.walk();
        stack.extend(node.named_children(&mut cursor));
    }
    count
}

fn is_branch(kind: &str) -> bool {
    matches!(
        kind,
        "if_statement"
            | "elif_clause"
            | "for_statement"
            | "while_statement"
            | "conditional_expression"
            | "try_statement"
            | "except_clause"
            | "except_group_clause"
            | "boolean_operator"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn estimate(code: &str) -> u32 {
        ComplexityEstimator::new().unwrap().estimate(code)
    }

    #[test]
    fn straight_line_code_is_one() {
        assert_eq!(estimate("def f():\n    return 1\n"), 1);
        assert_eq!(estimate(""), 1);
    }

    #[test]
    fn counts_conditionals_and_loops() {
        let code = r#"
def f(items):
    for item in items:
        if item > 1:
            continue
        elif item < 0:
            break
    while True:
        pass
    return 1 if items else 0
"#;
        // for, if, elif, while, conditional expression
        assert_eq!(estimate(code), 6);
    }

    #[test]
    fn counts_async_for() {
        let code = "async def f(xs):\n    async for x in xs:\n        pass\n";
        assert_eq!(estimate(code), 2);
    }

    #[test]
    fn counts_try_and_each_handler() {
        let code = r#"
try:
    run()
except ValueError:
    pass
except KeyError:
    pass
"#;
        assert_eq!(estimate(code), 4);
    }

    #[test]
    fn boolean_operands_add_k_minus_one() {
        assert_eq!(estimate("x = a and b\n"), 2);
        assert_eq!(estimate("x = a and b and c\n"), 3);
        assert_eq!(estimate("x = a or b and c or d\n"), 4);
    }

    #[test]
    fn comprehension_clauses_are_not_branches() {
        assert_eq!(estimate("x = [i for i in range(3) if i]\n"), 1);
    }

    #[test]
    fn unparseable_code_is_baseline() {
        assert_eq!(estimate("def broken(:\n    if\n"), BASE_COMPLEXITY);
    }

    #[test]
    fn python2_statements_are_baseline() {
        assert_eq!(estimate("if x:\n    print \"hello\"\n"), BASE_COMPLEXITY);
        assert_eq!(estimate("if x:\n    exec \"y = 1\"\n"), BASE_COMPLEXITY);
        assert_eq!(estimate("if x:\n    print(\"hello\")\n"), 2);
    }
}
