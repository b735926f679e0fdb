//! Changed-symbol extraction: added lines -> innermost enclosing definitions

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use crate::core::{FileId, LineRange};
use crate::error::ExtractError;
use streaming_iterator::StreamingIterator;
use tree_sitter::{Parser, Query, QueryCursor};

const DEFINITION_QUERY: &str = r#"
(function_definition name: (identifier) @name) @def
(class_definition name: (identifier) @name) @def
"#;

/// A `def`, `async def` or `class` and the lines it spans (1-based, inclusive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Definition {
    pub name: String,
    pub start_line: usize,
    pub end_line: usize,
}

impl Definition {
    pub fn contains(&self, line: usize) -> bool {
        (self.start_line..=self.end_line).contains(&line)
    }

    fn span(&self) -> usize {
        self.end_line - self.start_line
    }
}

/// Every definition in `content`, in source order.
///
/// A decorated definition starts at its first decorator. Sources with syntax
/// errors still yield whatever definitions tree-sitter recovered.
pub fn definitions(content: &str) -> Result<Vec<Definition>, ExtractError> {
    let language: tree_sitter::Language = tree_sitter_python::LANGUAGE.into();
    let mut parser = Parser::new();
    parser.set_language(&language)?;

    let tree = parser
        .parse(content, None)
        .ok_or(ExtractError::Parse { line: 1 })?;
    let query = Query::new(&language, DEFINITION_QUERY)?;
    let source = content.as_bytes();
    let mut cursor = QueryCursor::new();
    let mut matches = cursor.matches(&query, tree.root_node(), source);

    let mut found = Vec::new();
    while let Some(m) = matches.next() {
        let mut name = None;
        let mut node = None;
        for capture in m.captures {
            match query.capture_names()[capture.index as usize] {
                "name" => name = capture.node.utf8_text(source).ok(),
                "def" => node = Some(capture.node),
                _ => {}
            }
        }
        let (Some(name), Some(node)) = (name, node) else {
            continue;
        };

        let start = match node.parent() {
            Some(parent) if parent.kind() == "decorated_definition" => parent.start_position(),
            _ => node.start_position(),
        };
        found.push(Definition {
            name: name.to_string(),
            start_line: start.row + 1,
            end_line: node.end_position().row + 1,
        });
    }

    found.sort_by_key(|d| (d.start_line, d.end_line));
    Ok(found)
}

/// Names of the innermost definitions enclosing any of `lines`.
pub fn symbols_for_lines<I>(definitions: &[Definition], lines: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = usize>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            definitions
                .iter()
                .filter(|d| d.contains(line))
                .min_by(|a, b| a.span().cmp(&b.span()).then(b.start_line.cmp(&a.start_line)))
                .map(|d| d.name.clone())
        })
        .collect()
}

/// What a set of added lines touched, per file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolChanges {
    /// Innermost definitions touched, only for files where there is one.
    pub symbols: BTreeMap<String, BTreeSet<String>>,
    /// Files with added code outside every definition (imports, constants,
    /// module-level statements).
    pub module_level: BTreeSet<String>,
}

impl SymbolChanges {
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty() && self.module_level.is_empty()
    }
}

/// True if line `line` (1-based) of `source` holds code rather than a blank
/// or a comment.
fn is_code_line(source: &[&str], line: usize) -> bool {
    line.checked_sub(1)
        .and_then(|i| source.get(i))
        .is_some_and(|text| {
            let text = text.trim();
            !text.is_empty() && !text.starts_with('#')
        })
}

/// Maps added-line ranges per file to the symbols they touch.
///
/// Files that cannot be read are left out of the result.
pub fn changed_symbols(root: &Path, added: &BTreeMap<String, Vec<LineRange>>) -> SymbolChanges {
    let mut changes = SymbolChanges::default();

    for (file, ranges) in added {
        let id = FileId::new(file);
        let content = match std::fs::read_to_string(id.to_path(root)) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("could not read {}: {}", id, err);
                continue;
            }
        };
        let defs = match definitions(&content) {
            Ok(defs) => defs,
            Err(err) => {
                tracing::warn!("could not parse {}: {}", id, err);
                continue;
            }
        };

        let source: Vec<&str> = content.lines().collect();
        let lines: Vec<usize> = ranges
            .iter()
            .flat_map(|range| range.lines().take_while(|&line| line <= source.len()))
            .collect();
        let outside = lines
            .iter()
            .any(|&line| is_code_line(&source, line) && !defs.iter().any(|d| d.contains(line)));
        if outside {
            tracing::debug!(file = %id, "module-level change");
            changes.module_level.insert(id.as_str().to_string());
        }

        let symbols = symbols_for_lines(&defs, lines);
        if !symbols.is_empty() {
            tracing::debug!(file = %id, ?symbols, "changed symbols");
            changes.symbols.insert(id.as_str().to_string(), symbols);
        }
    }

    changes
}
