//! File index: every Python source file of a project snapshot

use crate::core::FileId;
use crate::error::{DepperError, DepperResult};
use crate::fs::{is_excluded, walk_python_files};
use crate::utils::depperignore::load_depperignore;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

/// The set of source files a session analyzes, keyed by [`FileId`].
#[derive(Debug, Clone)]
pub struct FileIndex {
    root: PathBuf,
    files: BTreeSet<FileId>,
}

impl FileIndex {
    /// Scans `root` for `.py` files, skipping any whose relative path
    /// contains one of `exclusions` or a pattern from `.depperignore`.
    ///
    /// Fails if the root is missing, not a directory, or unreadable.
    pub fn scan(root: &Path, exclusions: &[String]) -> DepperResult<Self> {
        if !root.exists() {
            return Err(DepperError::RootNotFound(root.to_path_buf()));
        }
        if !root.is_dir() {
            return Err(DepperError::RootNotDirectory(root.to_path_buf()));
        }
        std::fs::read_dir(root).map_err(|source| DepperError::Io {
            path: root.to_path_buf(),
            source,
        })?;

        let mut patterns = exclusions.to_vec();
        patterns.extend(load_depperignore(root));

        let files = walk_python_files(root, &patterns)
            .into_iter()
            .filter_map(|path| {
                let relative = path.strip_prefix(root).ok()?;
                let id = FileId::from_relative_path(relative);
                (!is_excluded(id.as_str(), &patterns)).then_some(id)
            })
            .collect::<BTreeSet<_>>();

        tracing::debug!(root = %root.display(), files = files.len(), "indexed project");

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Builds an index from an explicit file list, without touching the disk.
    pub fn from_files<I, S>(root: impl Into<PathBuf>, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            root: root.into(),
            files: files.into_iter().map(FileId::new).collect(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, file: &str) -> bool {
        self.files.contains(file)
    }

    pub fn iter(&self) -> impl Iterator<Item = &FileId> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// True if any indexed path starts with `name`.
    pub fn has_prefix(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.as_str().starts_with(name))
    }

    /// True if the project itself holds top-level module `name`, either as
    /// `name.py` or as a `name/` package directory.
    pub fn provides_module(&self, name: &str) -> bool {
        let package = format!("{}/", name);
        self.contains(&format!("{}.py", name))
            || self.files.iter().any(|f| f.as_str().starts_with(&package))
    }
}
