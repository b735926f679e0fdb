//! Core module for depper
//!
//! This module contains the core types and the project file index.

pub mod scanner;
mod types;

pub use scanner::FileIndex;
pub use types::*;
