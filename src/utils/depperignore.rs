//! `.depperignore`: extra exclusion substrings kept in the project root

use std::fs;
use std::io;
use std::path::Path;

pub const IGNORE_FILE: &str = ".depperignore";

/// Exclusion substrings listed in `<root>/.depperignore`, one per line.
///
/// Blank lines and `#` comments are skipped and a leading `./` is dropped, so
/// entries may be written relative to the root. A missing file means no extra
/// exclusions; an unreadable one is logged and ignored.
pub fn load_depperignore(root: &Path) -> Vec<String> {
    let path = root.join(IGNORE_FILE);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::warn!("could not read {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    let patterns = parse_patterns(&content);
    tracing::debug!(count = patterns.len(), "loaded {}", IGNORE_FILE);
    patterns
}

fn parse_patterns(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with('#'))
        .map(|line| line.strip_prefix("./").unwrap_or(line))
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_patterns() {
        let patterns = parse_patterns("# generated code\nmigrations/\n\n  legacy  \n./build\n./\n");
        assert_eq!(patterns, vec!["migrations/", "legacy", "build"]);
    }

    #[test]
    fn test_load_from_root() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        fs::write(temp.path().join(IGNORE_FILE), "vendor/\n")?;
        assert_eq!(load_depperignore(temp.path()), vec!["vendor/".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_means_no_patterns() -> anyhow::Result<()> {
        let temp = TempDir::new()?;
        assert!(load_depperignore(temp.path()).is_empty());
        Ok(())
    }
}
