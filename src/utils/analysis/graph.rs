use std::collections::{BTreeSet, HashMap, HashSet};

use crate::core::{FileId, ImportedSymbols};

/// File-level import graph with both edge directions kept in step.
///
/// `b` is in `dependencies_of(a)` exactly when `a` is in `dependents_of(b)`.
/// Every node has an entry in both maps, even with no edges.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    forward: HashMap<FileId, HashSet<FileId>>,
    reverse: HashMap<FileId, HashSet<FileId>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, file: FileId) {
        self.forward.entry(file.clone()).or_default();
        self.reverse.entry(file).or_default();
    }

    /// Records that `from` imports `to`.
    pub fn add_edge(&mut self, from: FileId, to: FileId) {
        self.add_node(from.clone());
        self.add_node(to.clone());
        if let Some(targets) = self.forward.get_mut(&from) {
            targets.insert(to.clone());
        }
        if let Some(sources) = self.reverse.get_mut(&to) {
            sources.insert(from);
        }
    }

    /// Files `file` imports directly.
    pub fn dependencies(&self, file: &str) -> Option<&HashSet<FileId>> {
        self.forward.get(file)
    }

    /// Files that import `file` directly.
    pub fn dependents(&self, file: &str) -> Option<&HashSet<FileId>> {
        self.reverse.get(file)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &FileId> {
        self.forward.keys()
    }

    pub fn node_count(&self) -> usize {
        self.forward.len()
    }

    pub fn edge_count(&self) -> usize {
        self.forward.values().map(HashSet::len).sum()
    }

    pub fn has_node(&self, file: &str) -> bool {
        self.forward.contains_key(file)
    }
}

/// Which names each importer binds from each of its dependencies.
#[derive(Debug, Clone, Default)]
pub struct SymbolImportTable {
    entries: HashMap<FileId, HashMap<FileId, ImportedSymbols>>,
}

impl SymbolImportTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `symbols` into the (importer, dependency) entry.
    pub fn record(&mut self, importer: &FileId, dependency: &FileId, symbols: &ImportedSymbols) {
        let row = self.entries.entry(importer.clone()).or_default();
        match row.get_mut(dependency) {
            Some(existing) => existing.merge(symbols),
            None => {
                row.insert(dependency.clone(), symbols.clone());
            }
        }
    }

    pub fn get(&self, importer: &str, dependency: &str) -> Option<&ImportedSymbols> {
        self.entries.get(importer)?.get(dependency)
    }

    /// Importers of `dependency`, each with what it binds from it.
    pub fn importers_of<'a>(
        &'a self,
        dependency: &'a str,
    ) -> impl Iterator<Item = (&'a FileId, &'a ImportedSymbols)> + 'a {
        self.entries
            .iter()
            .filter_map(move |(importer, row)| row.get(dependency).map(|s| (importer, s)))
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sorted copy of an optional edge set, for reporting.
pub fn sorted(set: Option<&HashSet<FileId>>) -> BTreeSet<FileId> {
    set.map(|s| s.iter().cloned().collect()).unwrap_or_default()
}
