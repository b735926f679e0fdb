//! Cycle-safe transitive closure over the dependency graph

use std::collections::HashSet;

use crate::core::FileId;
use crate::utils::analysis::graph::DependencyGraph;

/// Which way to follow edges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Importer to imported: everything `start` depends on.
    Dependencies,
    /// Imported to importer: everything that depends on `start`.
    Dependents,
}

/// All files reachable from `start` through one or more edges.
///
/// `start` itself is only part of the result when an import cycle leads back
/// to it. Iterative, so deep or cyclic graphs cannot exhaust the stack.
pub fn transitive_closure(
    graph: &DependencyGraph,
    start: &str,
    direction: Direction,
) -> HashSet<FileId> {
    let neighbours = |file: &str| match direction {
        Direction::Dependencies => graph.dependencies(file),
        Direction::Dependents => graph.dependents(file),
    };

    let mut reached: HashSet<FileId> = HashSet::new();
    let mut stack: Vec<&FileId> = neighbours(start).into_iter().flatten().collect();

    while let Some(file) = stack.pop() {
        if !reached.insert(file.clone()) {
            continue;
        }
        if let Some(next) = neighbours(file.as_str()) {
            stack.extend(next.iter().filter(|n| !reached.contains(*n)));
        }
    }

    reached
}
