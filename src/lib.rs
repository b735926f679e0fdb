pub mod config;
pub mod core;
pub mod error;
pub mod format;
pub mod fs;
pub mod git;
pub mod runner;
pub mod session;
pub mod utils;

// Re-export key items for convenience
pub use config::{DepperConfig, OutputFormat};
pub use core::{FileId, FileIndex, ImportDeclaration, ImportedSymbols, LineRange};
pub use error::{DepperError, DepperResult, ExtractError};
pub use runner::{ChangeSource, run, select_tests};
pub use session::{Session, SessionBuilder};
pub use utils::analysis::{
    ChangeReport, ExternalClassifier, PythonEnvironment, SymbolChangeReport, TestClassifier,
    TestPatterns,
};
