//! Core types shared across depper modules

use serde::Serialize;
use std::borrow::Borrow;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path, PathBuf};

/// Project-root-relative path of a source file.
///
/// Always `/`-separated with no empty, `.` or `..` segments, so two ids
/// naming the same file compare equal. This is the only node identity used
/// by the dependency graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FileId(String);

impl FileId {
    /// Normalizes a raw path string (either separator, optional `./` prefix).
    pub fn new(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();
        for segment in raw.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        Self(segments.join("/"))
    }

    /// Builds an id from a path already relative to the project root.
    pub fn from_relative_path(path: &Path) -> Self {
        let joined = path
            .components()
            .filter_map(|c| match c {
                Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
                Component::ParentDir => Some("..".to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");
        Self::new(joined)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Directory segments containing this file (empty for root-level files).
    pub fn dir_segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.0.split('/').collect();
        segments.pop();
        segments
    }

    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0.split('/').fold(root.to_path_buf(), |acc, s| acc.join(s))
    }

    pub fn is_python(&self) -> bool {
        self.0.ends_with(".py")
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FileId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for FileId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FileId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

/// Names an importer binds from one dependency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportedSymbols {
    /// `import module` or `from module import *`: every name counts.
    Wildcard,
    Names(BTreeSet<String>),
}

impl ImportedSymbols {
    pub fn names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Names(names.into_iter().map(Into::into).collect())
    }

    pub fn is_wildcard(&self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Folds another declaration's names into this entry. Wildcard absorbs.
    pub fn merge(&mut self, other: &ImportedSymbols) {
        if other.is_wildcard() {
            *self = Self::Wildcard;
            return;
        }
        if let (Self::Names(mine), Self::Names(theirs)) = (self, other) {
            mine.extend(theirs.iter().cloned());
        }
    }

    /// True if a change to any of `changed` reaches this binding.
    pub fn overlaps(&self, changed: &BTreeSet<String>) -> bool {
        if changed.is_empty() {
            return false;
        }
        match self {
            Self::Wildcard => true,
            Self::Names(names) => !names.is_disjoint(changed),
        }
    }
}

/// One import statement's worth of dependency information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDeclaration {
    /// Dotted module path; empty for `from . import x`.
    pub module: String,
    /// Number of leading dots, 0 for absolute imports.
    pub level: usize,
    pub symbols: ImportedSymbols,
}

impl ImportDeclaration {
    pub fn absolute(module: impl Into<String>, symbols: ImportedSymbols) -> Self {
        Self {
            module: module.into(),
            level: 0,
            symbols,
        }
    }

    pub fn relative(module: impl Into<String>, level: usize, symbols: ImportedSymbols) -> Self {
        Self {
            module: module.into(),
            level,
            symbols,
        }
    }

    pub fn is_relative(&self) -> bool {
        self.level > 0
    }
}

/// An inclusive range of lines (1-based) added in the new revision of a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineRange {
    pub start: usize,
    pub count: usize,
}

impl LineRange {
    pub fn new(start: usize, count: usize) -> Self {
        Self { start, count }
    }

    pub fn lines(&self) -> std::ops::Range<usize> {
        self.start..self.start.saturating_add(self.count)
    }
}
