use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::core::{FileId, FileIndex, ImportedSymbols};
use crate::utils::analysis::external::ExternalClassifier;
use crate::utils::analysis::graph::{DependencyGraph, SymbolImportTable};
use crate::utils::analysis::imports::extract_imports;
use crate::utils::analysis::resolver::ImportResolver;

/// Resolved imports of a single file, computed independently of every other file.
#[derive(Debug, Clone)]
pub struct FileImports {
    pub file: FileId,
    /// Each dependency with the union of what this file binds from it.
    pub dependencies: BTreeMap<FileId, ImportedSymbols>,
}

/// Reads, parses and resolves the imports of one indexed file.
///
/// Unreadable or unparsable files are logged and come back with no
/// dependencies; they stay in the graph as isolated nodes.
pub fn analyze_file(index: &FileIndex, resolver: &ImportResolver<'_>, file: &FileId) -> FileImports {
    let mut result = FileImports {
        file: file.clone(),
        dependencies: BTreeMap::new(),
    };

    let path = file.to_path(index.root());
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) => {
            tracing::warn!("could not read {}: {}", file, err);
            return result;
        }
    };

    let declarations = match extract_imports(&content) {
        Ok(declarations) => declarations,
        Err(err) => {
            tracing::warn!("could not parse {}: {}", file, err);
            return result;
        }
    };

    for declaration in &declarations {
        for dependency in resolver.resolve(declaration, file) {
            match result.dependencies.get_mut(&dependency) {
                Some(existing) => existing.merge(&declaration.symbols),
                None => {
                    result
                        .dependencies
                        .insert(dependency, declaration.symbols.clone());
                }
            }
        }
    }

    tracing::trace!(%file, imports = declarations.len(), resolved = result.dependencies.len());
    result
}

/// Builds the forward/reverse graph and the symbol table for every indexed file.
///
/// Files are analyzed in parallel; the results are merged by a single writer
/// afterwards, so the graph is never shared mutably.
pub fn build_dependency_graph(
    index: &FileIndex,
    external: &dyn ExternalClassifier,
) -> (DependencyGraph, SymbolImportTable) {
    let resolver = ImportResolver::new(index, external);
    let files: Vec<&FileId> = index.iter().collect();

    let analyzed: Vec<FileImports> = files
        .par_iter()
        .map(|file| analyze_file(index, &resolver, file))
        .collect();

    merge(index, analyzed)
}

/// Folds per-file results into one graph; every indexed file becomes a node.
pub fn merge(
    index: &FileIndex,
    analyzed: Vec<FileImports>,
) -> (DependencyGraph, SymbolImportTable) {
    let mut graph = DependencyGraph::new();
    let mut symbols = SymbolImportTable::new();

    for file in index.iter() {
        graph.add_node(file.clone());
    }

    for file_imports in analyzed {
        for (dependency, imported) in file_imports.dependencies {
            symbols.record(&file_imports.file, &dependency, &imported);
            graph.add_edge(file_imports.file.clone(), dependency);
        }
    }

    tracing::debug!(
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "built dependency graph"
    );
    (graph, symbols)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::analysis::external::PythonEnvironment;
    use std::fs;
    use tempfile::TempDir;

    fn write(root: &std::path::Path, rel: &str, content: &str) -> std::io::Result<()> {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)
    }

    #[test]
    fn test_build_graph_with_symbols() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        write(root, "calc.py", "import math\n\ndef add(a, b):\n    return a + b\n")?;
        write(root, "test_calc.py", "from calc import add\nimport calc\n")?;
        write(root, "test_other.py", "from calc import add, subtract\n")?;

        let index = FileIndex::scan(root, &[])?;
        let env = PythonEnvironment::stdlib_only();
        let (graph, symbols) = build_dependency_graph(&index, &env);

        assert!(graph.dependencies("calc.py").unwrap().is_empty());
        assert_eq!(graph.dependents("calc.py").unwrap().len(), 2);
        assert!(symbols.get("test_calc.py", "calc.py").unwrap().is_wildcard());
        assert_eq!(
            symbols.get("test_other.py", "calc.py"),
            Some(&ImportedSymbols::names(["add", "subtract"]))
        );
        Ok(())
    }

    #[test]
    fn test_parse_failure_keeps_node() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        let root = temp.path();
        write(root, "good.py", "import broken\n")?;
        write(root, "broken.py", "import good\ndef oops(:\n")?;

        let index = FileIndex::scan(root, &[])?;
        let env = PythonEnvironment::stdlib_only();
        let (graph, _) = build_dependency_graph(&index, &env);

        assert!(graph.has_node("broken.py"));
        assert!(graph.dependencies("broken.py").unwrap().is_empty());
        assert!(graph.dependents("broken.py").unwrap().contains("good.py"));
        Ok(())
    }
}
