//! Analysis utilities for Python test impact
//!
//! Import extraction and resolution, the dependency graph, closures over it,
//! and test selection on top.

pub mod closure;
pub mod dependencies;
pub mod external;
pub mod graph;
pub mod impact;
pub mod imports;
pub mod resolver;
pub mod symbols;

// Re-export commonly used items
pub use closure::{Direction, transitive_closure};
pub use dependencies::build_dependency_graph;
pub use external::{ExternalClassifier, PythonEnvironment};
pub use graph::{DependencyGraph, SymbolImportTable};
pub use impact::{
    ChangeReport, ModuleToTests, SymbolChangeReport, TestClassifier, TestPatterns, TestSelector,
};
pub use imports::extract_imports;
pub use resolver::ImportResolver;
pub use symbols::{SymbolChanges, changed_symbols};
