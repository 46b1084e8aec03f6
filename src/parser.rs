#![warn(missing_docs)]
#![warn(clippy::missing_docs_in_private_items)]

//! Tree-sitter parser wrapper for Python source code.

use std::fmt::Formatter;

use anyhow::{Context, Result, anyhow};
use tree_sitter::{Node, Tree};

use crate::error::GradeError;

/// A struct that wraps a tree-sitter parse tree and the source it came from.
#[derive(Clone)]
pub struct Parser {
    /// The source code being parsed.
    code: String,
    /// The parse tree.
    tree: Tree,
}

/// Returns the compiled tree-sitter Python language.
fn python_language() -> tree_sitter::Language {
    tree_sitter_python::LANGUAGE.into()
}

impl std::fmt::Debug for Parser {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Parser")
            .field("lines", &self.line_count())
            .finish()
    }
}

impl Parser {
    /// Returns a new parser object.
    ///
    /// * `source_code`: the source code to be parsed
    pub fn new(source_code: String) -> Result<Self> {
        let mut parser = tree_sitter::Parser::new();
        let language = python_language();

        parser
            .set_language(&language)
            .with_context(|| "Failed to load Python grammar")?;
        let tree = parser
            .parse(source_code.as_str(), None)
            .ok_or_else(|| anyhow!("Error parsing Python code"))?;

        Ok(Self {
            code: source_code,
            tree,
        })
    }

    /// A getter for parser's source code.
    pub fn code(&self) -> &str {
        self.code.as_str()
    }

    /// Returns the parse tree's root node.
    pub fn root_node(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// Returns the source text spanned by `node`.
    pub fn node_text(&self, node: Node<'_>) -> &str {
        node.utf8_text(self.code.as_bytes()).unwrap_or_default()
    }

    /// Returns the total number of lines in the source code.
    pub fn line_count(&self) -> usize {
        self.code.lines().count()
    }

    /// Fails with the position of the first syntax error, if the tree has
    /// any.
    ///
    /// Tree-sitter always produces a tree, recovering from bad input with
    /// `ERROR` and missing nodes; graph construction expects a clean one.
    /// The grammar also accepts Python 2 `print`/`exec` statements, which
    /// are rejected here too.
    pub fn ensure_valid(&self) -> Result<(), GradeError> {
        let root = self.root_node();
        let node = if root.has_error() {
            first_error(root).unwrap_or(root)
        } else if let Some(node) = self.first_python2_statement(root) {
            node
        } else {
            return Ok(());
        };

        let position = node.start_position();
        Err(GradeError::Syntax {
            line:   position.row + 1,
            column: position.column + 1,
        })
    }

    /// Finds the first `print`/`exec` statement not written as a call.
    fn first_python2_statement<'t>(&self, node: Node<'t>) -> Option<Node<'t>> {
        let keyword = match node.kind() {
            "print_statement" => Some("print"),
            "exec_statement" => Some("exec"),
            _ => None,
        };
        if let Some(keyword) = keyword {
            let args = self
                .node_text(node)
                .strip_prefix(keyword)
                .unwrap_or_default()
                .trim_start();
            if !args.starts_with('(') {
                return Some(node);
            }
        }

        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        children
            .into_iter()
            .find_map(|child| self.first_python2_statement(child))
    }
}

/// Finds the first `ERROR` or missing node in pre-order.
fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }

    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_valid_source() {
        let parser = Parser::new("def f():\n    return 1\n".to_string()).expect("parse");
        assert!(parser.ensure_valid().is_ok());
        assert_eq!(parser.root_node().kind(), "module");
        assert_eq!(parser.line_count(), 2);
    }

    #[test]
    fn reports_first_syntax_error() {
        let parser = Parser::new("x = 1\ndef f(:\n    pass\n".to_string()).expect("parse");
        match parser.ensure_valid() {
            Err(GradeError::Syntax { line, .. }) => assert!(line >= 2),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn rejects_python2_print() {
        let parser = Parser::new("x = 1\nprint 'hello'\n".to_string()).expect("parse");
        match parser.ensure_valid() {
            Err(GradeError::Syntax { line, column }) => assert_eq!((line, column), (2, 1)),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn accepts_print_calls() {
        let parser =
            Parser::new("print('hello')\nprint(1, 2)\nprint()\n".to_string()).expect("parse");
        assert!(parser.ensure_valid().is_ok());
    }

    #[test]
    fn empty_source_is_valid() {
        let parser = Parser::new(String::new()).expect("parse");
        assert!(parser.ensure_valid().is_ok());
    }
}
