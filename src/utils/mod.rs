//! Utility modules for depper
//!
//! - `analysis/` - Import graph, closures and test selection
//! - `depperignore` - Project-level exclusion file

pub mod analysis;
pub mod depperignore;

// Analysis re-exports
pub use analysis::closure;
pub use analysis::graph;
pub use analysis::impact;
