//! Error types for session construction and source extraction

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort building an analysis session.
#[derive(Debug, Error)]
pub enum DepperError {
    #[error("project root not found: {}", .0.display())]
    RootNotFound(PathBuf),

    #[error("project root is not a directory: {}", .0.display())]
    RootNotDirectory(PathBuf),

    #[error("failed to read {}: {}", .path.display(), .source)]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for session-level operations.
pub type DepperResult<T> = Result<T, DepperError>;

/// Why a single file yielded no import declarations.
///
/// Never fatal: the graph builder logs it and keeps the file as an isolated node.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to load python grammar: {0}")]
    Language(#[from] tree_sitter::LanguageError),

    #[error("failed to compile tree-sitter query: {0}")]
    Query(#[from] tree_sitter::QueryError),

    #[error("syntax error near line {line}")]
    Parse { line: usize },
}
