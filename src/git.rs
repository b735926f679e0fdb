use anyhow::{Context, Result, anyhow};
use git2::{Commit, Diff, DiffOptions, Patch, Repository};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::core::{FileId, LineRange};

lazy_static! {
    // +++ b/path/to/file.py
    static ref NEW_FILE_HEADER: Regex = Regex::new(r"^\+\+\+ (?:b/)?(.+?)\s*$").unwrap();
    // @@ -old_start[,old_count] +new_start[,new_count] @@
    static ref HUNK_HEADER: Regex =
        Regex::new(r"^@@ -\d+(?:,\d+)? \+(\d+)(?:,(\d+))? @@").unwrap();
}

/// Files changed relative to a base revision, with the lines each one gained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub files: BTreeSet<FileId>,
    /// Added-line ranges in the new revision, keyed by project-relative path.
    pub added_lines: BTreeMap<String, Vec<LineRange>>,
}

impl ChangeSet {
    fn add(&mut self, file: FileId, ranges: Vec<LineRange>) {
        self.added_lines
            .entry(file.as_str().to_string())
            .or_default()
            .extend(ranges);
        self.files.insert(file);
    }

    /// Keeps only Python files that still exist under `root`.
    pub fn retain_existing(&mut self, root: &Path) {
        self.files
            .retain(|file| file.is_python() && file.to_path(root).is_file());
        let files = &self.files;
        self.added_lines.retain(|file, _| files.contains(file.as_str()));
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file_list(&self) -> Vec<String> {
        self.files.iter().map(|f| f.as_str().to_string()).collect()
    }
}

/// Changes between `base` and the working tree of the repository containing
/// `project_root`.
///
/// `origin/<base>` is tried before `<base>`. Inside a GitHub pull request run
/// (`GITHUB_EVENT_NAME=pull_request`) the comparison is merge base to `HEAD`.
pub fn changed_files(project_root: &Path, base: &str) -> Result<ChangeSet> {
    let pull_request = std::env::var("GITHUB_EVENT_NAME").is_ok_and(|event| event == "pull_request");
    diff_against(project_root, base, pull_request)
}

pub fn diff_against(project_root: &Path, base: &str, pull_request: bool) -> Result<ChangeSet> {
    let repo = Repository::discover(project_root)
        .with_context(|| format!("Not a git repository: {:?}", project_root))?;
    let base_commit = resolve_base(&repo, base)?;

    let mut opts = DiffOptions::new();
    opts.context_lines(0);

    let diff = if pull_request {
        let head = repo
            .head()
            .and_then(|h| h.peel_to_commit())
            .context("Failed to resolve HEAD")?;
        let merge_base = repo
            .merge_base(base_commit.id(), head.id())
            .with_context(|| format!("No merge base between {} and HEAD", base))?;
        let from = repo.find_commit(merge_base)?.tree()?;
        repo.diff_tree_to_tree(Some(&from), Some(&head.tree()?), Some(&mut opts))?
    } else {
        repo.diff_tree_to_workdir_with_index(Some(&base_commit.tree()?), Some(&mut opts))?
    };

    let prefix = project_prefix(&repo, project_root);
    let mut changes = collect(&diff, prefix.as_deref())?;
    changes.retain_existing(project_root);

    tracing::debug!(base, files = changes.files.len(), "collected git changes");
    Ok(changes)
}

/// Name of the checked-out branch, `None` outside a repository.
pub fn current_branch(project_root: &Path) -> Option<String> {
    let repo = Repository::discover(project_root).ok()?;
    let head = repo.head().ok()?;
    head.shorthand().map(String::from)
}

/// Parses unified diff text (`git diff -U0` style) into a change set.
///
/// Only `+++` headers and hunk headers are read; a hunk without a new-side
/// count covers one line.
pub fn parse_unified_diff(text: &str) -> ChangeSet {
    let mut changes = ChangeSet::default();
    let mut current: Option<FileId> = None;

    for line in text.lines() {
        if let Some(caps) = NEW_FILE_HEADER.captures(line) {
            let path = &caps[1];
            current = (path != "/dev/null").then(|| FileId::new(path));
            if let Some(file) = &current {
                changes.add(file.clone(), Vec::new());
            }
        } else if let Some(caps) = HUNK_HEADER.captures(line) {
            let Some(file) = &current else {
                continue;
            };
            let start = caps[1].parse::<usize>().unwrap_or(0);
            let count = caps
                .get(2)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .unwrap_or(1);
            changes.add(file.clone(), vec![LineRange::new(start, count)]);
        }
    }

    changes
}

fn resolve_base<'r>(repo: &'r Repository, base: &str) -> Result<Commit<'r>> {
    for candidate in [format!("origin/{}", base), base.to_string()] {
        match repo.revparse_single(&candidate) {
            Ok(object) => {
                return object
                    .peel_to_commit()
                    .with_context(|| format!("{} does not point at a commit", candidate));
            }
            Err(_) => tracing::debug!(candidate = %candidate, "ref not found"),
        }
    }
    Err(anyhow!("Base ref not found: {} (also tried origin/{})", base, base))
}

/// Project root relative to the repository work tree, when it is a subdirectory.
fn project_prefix(repo: &Repository, project_root: &Path) -> Option<PathBuf> {
    let workdir = repo.workdir()?.canonicalize().ok()?;
    let root = project_root.canonicalize().ok()?;
    root.strip_prefix(&workdir).ok().map(Path::to_path_buf)
}

fn collect(diff: &Diff<'_>, prefix: Option<&Path>) -> Result<ChangeSet> {
    let mut changes = ChangeSet::default();

    for idx in 0..diff.deltas().len() {
        let Some(delta) = diff.get_delta(idx) else {
            continue;
        };
        let Some(path) = delta.new_file().path() else {
            continue;
        };
        let relative = match prefix {
            Some(prefix) => match path.strip_prefix(prefix) {
                Ok(relative) => relative,
                Err(_) => continue,
            },
            None => path,
        };

        let mut ranges = Vec::new();
        if let Some(patch) = Patch::from_diff(diff, idx)? {
            for hunk_idx in 0..patch.num_hunks() {
                let (hunk, _) = patch.hunk(hunk_idx)?;
                ranges.push(LineRange::new(
                    hunk.new_start() as usize,
                    hunk.new_lines() as usize,
                ));
            }
        }
        changes.add(FileId::from_relative_path(relative), ranges);
    }

    Ok(changes)
}
