//! Impact analysis for code changes
//!
//! Maps changed files (or changed symbols) to the test files that can observe
//! the change through the import graph.

use rayon::prelude::*;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;

use crate::core::{FileId, ImportedSymbols};
use crate::utils::analysis::closure::{Direction, transitive_closure};
use crate::utils::analysis::graph::{DependencyGraph, SymbolImportTable, sorted};

/// Default markers identifying test files.
pub const DEFAULT_TEST_PATTERNS: &[&str] = &["test_", "_test.py", "/tests/", "/test/"];

/// Decides whether a project file is a test file.
pub trait TestClassifier: Send + Sync {
    fn is_test(&self, file: &str) -> bool;
}

impl<F> TestClassifier for F
where
    F: Fn(&str) -> bool + Send + Sync,
{
    fn is_test(&self, file: &str) -> bool {
        self(file)
    }
}

/// Literal substring markers, matched against the path with a leading `/`
/// so that `/tests/` also matches a top-level `tests/` directory.
#[derive(Debug, Clone)]
pub struct TestPatterns {
    markers: Vec<String>,
}

impl TestPatterns {
    pub fn new<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            markers: markers.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for TestPatterns {
    fn default() -> Self {
        Self::new(DEFAULT_TEST_PATTERNS.iter().copied())
    }
}

impl TestClassifier for TestPatterns {
    fn is_test(&self, file: &str) -> bool {
        let anchored = format!("/{}", file);
        self.markers
            .iter()
            .any(|marker| !marker.is_empty() && anchored.contains(marker.as_str()))
    }
}

/// Precomputed non-test module -> tests that transitively import it.
#[derive(Debug, Clone, Default)]
pub struct ModuleToTests {
    index: HashMap<FileId, BTreeSet<FileId>>,
}

impl ModuleToTests {
    /// Walks the dependencies of every test file and inverts the result.
    pub fn build(graph: &DependencyGraph, classifier: &dyn TestClassifier) -> Self {
        let tests: Vec<&FileId> = graph
            .nodes()
            .filter(|file| classifier.is_test(file.as_str()))
            .collect();

        let reached: Vec<(&FileId, Vec<FileId>)> = tests
            .par_iter()
            .map(|test| {
                let modules = transitive_closure(graph, test.as_str(), Direction::Dependencies)
                    .into_iter()
                    .filter(|dep| !classifier.is_test(dep.as_str()))
                    .collect();
                (*test, modules)
            })
            .collect();

        let mut index: HashMap<FileId, BTreeSet<FileId>> = HashMap::new();
        for (test, modules) in reached {
            for module in modules {
                index.entry(module).or_default().insert(test.clone());
            }
        }

        tracing::debug!(tests = tests.len(), modules = index.len(), "mapped tests to modules");
        Self { index }
    }

    pub fn tests_for(&self, file: &str) -> Option<&BTreeSet<FileId>> {
        self.index.get(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FileId, &BTreeSet<FileId>)> {
        self.index.iter()
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }
}

/// Answers "which tests are affected" against a fully built graph.
pub struct TestSelector<'a> {
    graph: &'a DependencyGraph,
    symbols: &'a SymbolImportTable,
    module_to_tests: &'a ModuleToTests,
    classifier: &'a dyn TestClassifier,
}

impl<'a> TestSelector<'a> {
    pub fn new(
        graph: &'a DependencyGraph,
        symbols: &'a SymbolImportTable,
        module_to_tests: &'a ModuleToTests,
        classifier: &'a dyn TestClassifier,
    ) -> Self {
        Self {
            graph,
            symbols,
            module_to_tests,
            classifier,
        }
    }

    /// Tests reachable from any changed file through reverse imports, plus
    /// changed files that are tests themselves.
    pub fn affected_tests(&self, changed: &[FileId]) -> BTreeSet<FileId> {
        let mut affected = BTreeSet::new();

        for file in changed {
            if self.classifier.is_test(file.as_str()) {
                affected.insert(file.clone());
            }

            affected.extend(
                transitive_closure(self.graph, file.as_str(), Direction::Dependents)
                    .into_iter()
                    .filter(|dependent| self.classifier.is_test(dependent.as_str())),
            );

            if let Some(tests) = self.module_to_tests.tests_for(file.as_str()) {
                affected.extend(tests.iter().cloned());
            }
        }

        affected
    }

    /// Tests that directly import one of the changed symbols, or import the
    /// changed file wholesale. One hop only: re-exports are not followed.
    pub fn affected_tests_by_symbols(
        &self,
        changed: &BTreeMap<FileId, BTreeSet<String>>,
    ) -> BTreeSet<FileId> {
        let mut affected = BTreeSet::new();

        for (file, names) in changed {
            for (importer, imported) in self.symbols.importers_of(file.as_str()) {
                if self.classifier.is_test(importer.as_str()) && imported.overlaps(names) {
                    affected.insert(importer.clone());
                }
            }
        }

        affected
    }

    /// Diagnostics for one changed file.
    pub fn explain(&self, file: &FileId) -> ChangeReport {
        let dependents = transitive_closure(self.graph, file.as_str(), Direction::Dependents);
        ChangeReport {
            file: file.clone(),
            dependencies: sorted(self.graph.dependencies(file.as_str())),
            dependents: dependents.into_iter().collect(),
            direct_tests: self
                .module_to_tests
                .tests_for(file.as_str())
                .cloned()
                .unwrap_or_default(),
        }
    }

    /// Diagnostics for one file's changed symbols.
    pub fn explain_symbols(&self, file: &FileId, names: &BTreeSet<String>) -> SymbolChangeReport {
        let mut importers: Vec<SymbolImporter> = self
            .symbols
            .importers_of(file.as_str())
            .map(|(importer, imported)| SymbolImporter {
                file: importer.clone(),
                imported: imported.clone(),
                is_test: self.classifier.is_test(importer.as_str()),
                affected: imported.overlaps(names),
            })
            .collect();
        importers.sort_by(|a, b| a.file.cmp(&b.file));

        SymbolChangeReport {
            file: file.clone(),
            symbols: names.clone(),
            importers,
        }
    }
}

/// What one changed file touches.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeReport {
    pub file: FileId,
    /// Direct imports of the changed file.
    pub dependencies: BTreeSet<FileId>,
    /// Everything that transitively imports it.
    pub dependents: BTreeSet<FileId>,
    /// Tests recorded for it in the module-to-tests index.
    pub direct_tests: BTreeSet<FileId>,
}

impl fmt::Display for ChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Changed file: {}", self.file)?;
        write_list(f, "Dependencies", &self.dependencies)?;
        write_list(f, "Files that depend on this", &self.dependents)?;
        write_list(f, "Direct test coverage", &self.direct_tests)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SymbolImporter {
    pub file: FileId,
    pub imported: ImportedSymbols,
    pub is_test: bool,
    pub affected: bool,
}

/// Who imports which of a file's changed symbols.
#[derive(Debug, Clone, Serialize)]
pub struct SymbolChangeReport {
    pub file: FileId,
    pub symbols: BTreeSet<String>,
    pub importers: Vec<SymbolImporter>,
}

impl fmt::Display for SymbolChangeReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbols: Vec<&str> = self.symbols.iter().map(String::as_str).collect();
        writeln!(f, "Changed file: {}", self.file)?;
        writeln!(f, "  Changed symbols: {}", symbols.join(", "))?;
        for importer in &self.importers {
            let imported = match &importer.imported {
                ImportedSymbols::Wildcard => "*".to_string(),
                ImportedSymbols::Names(names) => {
                    names.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
                }
            };
            let marker = match (importer.is_test, importer.affected) {
                (true, true) => "selected",
                (true, false) => "skipped",
                (false, _) => "not a test",
            };
            writeln!(f, "  <- {} imports [{}] ({})", importer.file, imported, marker)?;
        }
        Ok(())
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, label: &str, files: &BTreeSet<FileId>) -> fmt::Result {
    if files.is_empty() {
        return Ok(());
    }
    writeln!(f, "  {}: {}", label, files.len())?;
    for file in files.iter().take(10) {
        writeln!(f, "    -> {}", file)?;
    }
    if files.len() > 10 {
        writeln!(f, "    ... and {} more", files.len() - 10)?;
    }
    Ok(())
}
