//! Import extraction for Python sources
//!
//! Parses a module with tree-sitter and turns every `import` / `from ... import`
//! statement, at any nesting depth, into an [`ImportDeclaration`].

use crate::core::{ImportDeclaration, ImportedSymbols};
use crate::error::ExtractError;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Node, Parser, Query, QueryCursor};

// `from __future__ import x` is its own node kind and is left out on purpose.
const IMPORT_QUERY: &str = r#"
(import_statement) @import
(import_from_statement) @from
"#;

/// Extracts import declarations from Python source text.
///
/// A source that does not parse cleanly yields an error instead of a partial
/// list; callers treat that file as having no dependencies.
pub fn extract_imports(content: &str) -> Result<Vec<ImportDeclaration>, ExtractError> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let tree = parser
        .parse(content, None)
        .ok_or(ExtractError::Parse { line: 1 })?;
    let root = tree.root_node();
    if root.has_error() {
        return Err(ExtractError::Parse {
            line: first_error_line(root),
        });
    }

    let query = Query::new(&language, IMPORT_QUERY)?;
    let source = content.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, root, source);

    let mut declarations = Vec::new();
    while let Some(m) = matches.next() {
        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "import" => declarations.extend(plain_import(capture.node, source)),
                "from" => declarations.extend(from_import(capture.node, source)),
                _ => {}
            }
        }
    }

    Ok(declarations)
}

/// `import a.b, c as d` -> one wildcard declaration per dotted name.
fn plain_import(node: Node<'_>, source: &[u8]) -> Vec<ImportDeclaration> {
    let mut cursor = node.walk();
    node.children_by_field_name("name", &mut cursor)
        .filter_map(|child| imported_name(child, source))
        .map(|module| ImportDeclaration::absolute(module, ImportedSymbols::Wildcard))
        .collect()
}

/// `from ..pkg.mod import a, b as c` -> one declaration carrying `{a, b}`.
fn from_import(node: Node<'_>, source: &[u8]) -> Option<ImportDeclaration> {
    let module_node = node.child_by_field_name("module_name")?;

    let (module, level) = if module_node.kind() == "relative_import" {
        let mut level = 0;
        let mut module = String::new();
        let mut cursor = module_node.walk();
        for child in module_node.named_children(&mut cursor) {
            match child.kind() {
                "import_prefix" => {
                    level = node_text(child, source)
                        .map(|t| t.chars().filter(|c| *c == '.').count())
                        .unwrap_or(0);
                }
                "dotted_name" => module = node_text(child, source).unwrap_or_default(),
                _ => {}
            }
        }
        (module, level)
    } else {
        (node_text(module_node, source)?, 0)
    };

    let mut cursor = node.walk();
    let is_wildcard = node
        .children(&mut cursor)
        .any(|child| child.kind() == "wildcard_import");

    let symbols = if is_wildcard {
        ImportedSymbols::Wildcard
    } else {
        let mut cursor = node.walk();
        ImportedSymbols::names(
            node.children_by_field_name("name", &mut cursor)
                .filter_map(|child| imported_name(child, source)),
        )
    };

    Some(ImportDeclaration::relative(module, level, symbols))
}

/// The original (un-aliased) name of an import target.
fn imported_name(node: Node<'_>, source: &[u8]) -> Option<String> {
    let target = if node.kind() == "aliased_import" {
        node.child_by_field_name("name")?
    } else {
        node
    };
    node_text(target, source).filter(|name| !name.is_empty())
}

/// Node text with any interior whitespace (`a . b`) removed.
fn node_text(node: Node<'_>, source: &[u8]) -> Option<String> {
    node.utf8_text(source)
        .ok()
        .map(|text| text.chars().filter(|c| !c.is_whitespace()).collect())
}

fn first_error_line(root: Node<'_>) -> usize {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if node.is_error() || node.is_missing() {
            return node.start_position().row + 1;
        }
        if node.has_error() {
            let mut cursor = node.walk();
            let children: Vec<_> = node.children(&mut cursor).collect();
            stack.extend(children.into_iter().rev());
        }
    }
    root.start_position().row + 1
}
