use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Walks `path` and returns every `.py` file beneath it, sorted.
///
/// Gitignore and hidden-file filtering are disabled: a test that imports a
/// generated or hidden module still depends on it. Symlinks are not followed,
/// so link cycles cannot trap the walk. Directories whose relative path
/// matches one of `exclusions` are pruned without being read.
pub fn walk_python_files(path: &Path, exclusions: &[String]) -> Vec<PathBuf> {
    let mut builder = WalkBuilder::new(path);
    builder.standard_filters(false);
    builder.follow_links(false);

    let root = path.to_path_buf();
    let exclusions = exclusions.to_vec();
    builder.filter_entry(move |entry| {
        if !entry.file_type().is_some_and(|ft| ft.is_dir()) {
            return true;
        }
        let Ok(relative) = entry.path().strip_prefix(&root) else {
            return true;
        };
        if relative.as_os_str().is_empty() {
            return true;
        }
        // Trailing slash so `generated/` prunes the `generated` directory.
        let dir = format!("{}/", relative.to_string_lossy().replace('\\', "/"));
        !is_excluded(&dir, &exclusions)
    });

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                let is_python = entry.path().extension().is_some_and(|ext| ext == "py");
                if is_python && entry.file_type().is_some_and(|ft| ft.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(err) => tracing::warn!("error walking directory: {}", err),
        }
    }

    files.sort();
    files
}

/// True if the relative path contains any of the exclusion substrings.
pub fn is_excluded(relative: &str, exclusions: &[String]) -> bool {
    exclusions
        .iter()
        .any(|pattern| !pattern.is_empty() && relative.contains(pattern.as_str()))
}
