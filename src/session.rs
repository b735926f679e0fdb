//! Analysis session: a built, immutable view of one project snapshot
//!
//! Building a [`Session`] indexes the project, extracts and resolves every
//! import, and precomputes which tests reach which modules. Afterwards the
//! session only answers queries and can be shared freely across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::{FileId, FileIndex};
use crate::error::DepperResult;
use crate::utils::analysis::dependencies::build_dependency_graph;
use crate::utils::analysis::external::{
    ExternalClassifier, PythonEnvironment, default_site_packages,
};
use crate::utils::analysis::graph::{DependencyGraph, SymbolImportTable, sorted};
use crate::utils::analysis::impact::{
    ChangeReport, ModuleToTests, SymbolChangeReport, TestClassifier, TestPatterns, TestSelector,
};

pub struct Session {
    index: FileIndex,
    graph: DependencyGraph,
    symbols: SymbolImportTable,
    module_to_tests: ModuleToTests,
    classifier: Box<dyn TestClassifier>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("root", &self.index.root())
            .field("files", &self.index.len())
            .field("edges", &self.graph.edge_count())
            .finish()
    }
}

impl Session {
    /// Builds a session with the default classifiers.
    ///
    /// An empty `test_patterns` falls back to the default markers.
    pub fn build(
        root: impl AsRef<Path>,
        exclusions: &[String],
        test_patterns: &[String],
    ) -> DepperResult<Self> {
        let mut builder = Session::builder(root.as_ref()).exclusions(exclusions.iter().cloned());
        if !test_patterns.is_empty() {
            builder = builder.test_classifier(TestPatterns::new(test_patterns.iter().cloned()));
        }
        builder.build()
    }

    pub fn builder(root: impl Into<PathBuf>) -> SessionBuilder {
        SessionBuilder {
            root: root.into(),
            exclusions: Vec::new(),
            external: None,
            classifier: None,
        }
    }

    fn selector(&self) -> TestSelector<'_> {
        TestSelector::new(
            &self.graph,
            &self.symbols,
            &self.module_to_tests,
            self.classifier.as_ref(),
        )
    }

    /// Tests affected by changes to `changed` (project-relative paths).
    pub fn affected_tests<S: AsRef<str>>(&self, changed: &[S]) -> BTreeSet<FileId> {
        let changed: Vec<FileId> = changed.iter().map(FileId::new).collect();
        self.selector().affected_tests(&changed)
    }

    /// Tests that directly import one of the changed symbols of a file.
    pub fn affected_tests_by_symbols(
        &self,
        changed: &BTreeMap<String, BTreeSet<String>>,
    ) -> BTreeSet<FileId> {
        self.selector().affected_tests_by_symbols(&normalize_keys(changed))
    }

    /// Direct imports of `file`.
    pub fn dependencies_of(&self, file: &str) -> BTreeSet<FileId> {
        sorted(self.graph.dependencies(FileId::new(file).as_str()))
    }

    /// Files that import `file` directly.
    pub fn dependents_of(&self, file: &str) -> BTreeSet<FileId> {
        sorted(self.graph.dependents(FileId::new(file).as_str()))
    }

    pub fn explain<S: AsRef<str>>(&self, changed: &[S]) -> Vec<ChangeReport> {
        let selector = self.selector();
        changed
            .iter()
            .map(|file| selector.explain(&FileId::new(file)))
            .collect()
    }

    pub fn explain_symbols(
        &self,
        changed: &BTreeMap<String, BTreeSet<String>>,
    ) -> Vec<SymbolChangeReport> {
        let selector = self.selector();
        normalize_keys(changed)
            .iter()
            .map(|(file, names)| selector.explain_symbols(file, names))
            .collect()
    }

    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    pub fn symbol_table(&self) -> &SymbolImportTable {
        &self.symbols
    }

    pub fn module_to_tests(&self) -> &ModuleToTests {
        &self.module_to_tests
    }

    pub fn file_index(&self) -> &FileIndex {
        &self.index
    }

    pub fn root(&self) -> &Path {
        self.index.root()
    }

    pub fn is_test(&self, file: &str) -> bool {
        self.classifier.is_test(FileId::new(file).as_str())
    }

    pub fn test_files(&self) -> BTreeSet<FileId> {
        self.index
            .iter()
            .filter(|file| self.classifier.is_test(file.as_str()))
            .cloned()
            .collect()
    }
}

fn normalize_keys(
    changed: &BTreeMap<String, BTreeSet<String>>,
) -> BTreeMap<FileId, BTreeSet<String>> {
    let mut normalized: BTreeMap<FileId, BTreeSet<String>> = BTreeMap::new();
    for (file, names) in changed {
        normalized
            .entry(FileId::new(file))
            .or_default()
            .extend(names.iter().cloned());
    }
    normalized
}

/// Configures classifiers and exclusions before building a [`Session`].
pub struct SessionBuilder {
    root: PathBuf,
    exclusions: Vec<String>,
    external: Option<Box<dyn ExternalClassifier>>,
    classifier: Option<Box<dyn TestClassifier>>,
}

impl SessionBuilder {
    pub fn exclusions<I, S>(mut self, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclusions.extend(exclusions.into_iter().map(Into::into));
        self
    }

    pub fn external_classifier(mut self, external: impl ExternalClassifier + 'static) -> Self {
        self.external = Some(Box::new(external));
        self
    }

    pub fn test_classifier(mut self, classifier: impl TestClassifier + 'static) -> Self {
        self.classifier = Some(Box::new(classifier));
        self
    }

    /// Indexes the project and builds every derived structure.
    ///
    /// Only root-level failures are errors; per-file problems are logged.
    pub fn build(self) -> DepperResult<Session> {
        let index = FileIndex::scan(&self.root, &self.exclusions)?;

        let external: Box<dyn ExternalClassifier> = match self.external {
            Some(external) => external,
            None => {
                let env = PythonEnvironment::discover(&default_site_packages(&self.root))
                    .without_project_packages(&index);
                tracing::debug!(installed = env.installed_count(), "discovered python environment");
                Box::new(env)
            }
        };
        let classifier: Box<dyn TestClassifier> = match self.classifier {
            Some(classifier) => classifier,
            None => Box::new(TestPatterns::default()),
        };

        let (graph, symbols) = build_dependency_graph(&index, external.as_ref());
        let module_to_tests = ModuleToTests::build(&graph, classifier.as_ref());

        tracing::info!(
            files = index.len(),
            edges = graph.edge_count(),
            modules_with_tests = module_to_tests.len(),
            "session ready"
        );

        Ok(Session {
            index,
            graph,
            symbols,
            module_to_tests,
            classifier,
        })
    }
}
