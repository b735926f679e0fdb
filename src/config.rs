use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::utils::analysis::impact::DEFAULT_TEST_PATTERNS;

/// Output format for the selection report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Plain,
    Json,
    Markdown,
}

/// Path substrings excluded from every scan unless the config replaces them.
pub const DEFAULT_EXCLUSIONS: &[&str] = &[
    "venv",
    ".venv",
    "build",
    "dist",
    ".git",
    "__pycache__",
    ".pytest_cache",
    ".mypy_cache",
    ".ruff_cache",
    "node_modules",
    ".tox",
];

/// Main configuration for depper
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepperConfig {
    /// Project root to analyze
    #[serde(skip)]
    pub root: PathBuf,
    /// Branch or ref the working tree is compared against
    pub base_branch: String,
    /// Path substrings to leave out of the file index
    pub exclude: Vec<String>,
    /// Substring markers identifying test files
    pub test_patterns: Vec<String>,
    /// Select by changed files only, never by changed symbols
    pub files_only: bool,
    /// Print dependency diagnostics for each change
    pub debug: bool,
    /// Print only the selected test paths
    pub list_only: bool,
    /// Select every test when nothing is affected
    pub run_all_on_empty: bool,
    /// Report format
    pub output_format: OutputFormat,
}

impl Default for DepperConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base_branch: "main".to_string(),
            exclude: DEFAULT_EXCLUSIONS.iter().map(|s| s.to_string()).collect(),
            test_patterns: DEFAULT_TEST_PATTERNS.iter().map(|s| s.to_string()).collect(),
            files_only: false,
            debug: false,
            list_only: false,
            run_all_on_empty: false,
            output_format: OutputFormat::Plain,
        }
    }
}

impl DepperConfig {
    /// Validates the configuration, ensuring the project root is a directory.
    pub fn validate(&self) -> anyhow::Result<()> {
        if !self.root.is_dir() {
            anyhow::bail!("Project root is not a directory: {:?}", self.root);
        }
        if self.base_branch.trim().is_empty() {
            anyhow::bail!("Base branch must not be empty");
        }
        Ok(())
    }

    /// Loads configuration from `depper.toml`, falling back to the
    /// `[tool.depper]` table of `pyproject.toml`. `None` if neither exists.
    pub fn load_from_dir(root: &Path) -> anyhow::Result<Option<Self>> {
        let standalone = root.join("depper.toml");
        if standalone.is_file() {
            let content = std::fs::read_to_string(&standalone)
                .with_context(|| format!("Failed to read {:?}", standalone))?;
            let mut config: Self = toml::from_str(&content)
                .with_context(|| format!("Invalid config in {:?}", standalone))?;
            config.root = root.to_path_buf();
            return Ok(Some(config));
        }

        let pyproject = root.join("pyproject.toml");
        if pyproject.is_file() {
            let content = std::fs::read_to_string(&pyproject)
                .with_context(|| format!("Failed to read {:?}", pyproject))?;
            let value: toml::Value = toml::from_str(&content)
                .with_context(|| format!("Invalid TOML in {:?}", pyproject))?;
            if let Some(table) = value.get("tool").and_then(|tool| tool.get("depper")) {
                let mut config: Self = table
                    .clone()
                    .try_into()
                    .with_context(|| format!("Invalid [tool.depper] in {:?}", pyproject))?;
                config.root = root.to_path_buf();
                return Ok(Some(config));
            }
        }

        Ok(None)
    }
}
