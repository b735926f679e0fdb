//! Output format modules for depper selection reports

pub mod json;
pub mod markdown;
pub mod plain;

use anyhow::Result;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::io::Write;

use crate::config::OutputFormat;
use crate::core::FileId;
use crate::utils::analysis::impact::{ChangeReport, SymbolChangeReport};

/// How the selected tests were chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectionMode {
    /// Tests importing a changed function or class.
    Symbols,
    /// Tests transitively importing a changed file.
    Files,
    /// Every test, because nothing was affected and the run asked for all.
    All,
}

impl fmt::Display for SelectionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SelectionMode::Symbols => "symbol-level",
            SelectionMode::Files => "file-level",
            SelectionMode::All => "all tests",
        };
        f.write_str(label)
    }
}

/// Dependency diagnostics printed in debug mode.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub files: Vec<ChangeReport>,
    pub symbols: Vec<SymbolChangeReport>,
}

/// Everything one run decided, ready to render.
#[derive(Debug, Clone, Serialize)]
pub struct SelectionReport {
    pub branch: Option<String>,
    /// Base ref the changes were taken from; `None` for explicit input.
    pub base: Option<String>,
    pub changed_files: Vec<FileId>,
    pub changed_symbols: BTreeMap<String, BTreeSet<String>>,
    pub mode: SelectionMode,
    pub selected: Vec<FileId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics: Option<Diagnostics>,
}

impl SelectionReport {
    /// `pytest a.py b.py`, or `None` when nothing was selected.
    pub fn pytest_command(&self) -> Option<String> {
        if self.selected.is_empty() {
            return None;
        }
        let files: Vec<&str> = self.selected.iter().map(FileId::as_str).collect();
        Some(format!("pytest {}", files.join(" ")))
    }
}

pub trait Formatter {
    fn write_header(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()>;

    fn write_changes(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()>;

    fn write_diagnostics(&mut self, output: &mut dyn Write, diagnostics: &Diagnostics)
    -> Result<()>;

    fn write_selection(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()>;

    fn write_footer(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()>;
}

pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Plain => Box::new(plain::PlainFormatter),
        OutputFormat::Json => Box::new(json::JsonFormatter),
        OutputFormat::Markdown => Box::new(markdown::MarkdownFormatter),
    }
}

/// Writes every section of `report` in order.
pub fn render(
    formatter: &mut dyn Formatter,
    output: &mut dyn Write,
    report: &SelectionReport,
) -> Result<()> {
    formatter.write_header(output, report)?;
    formatter.write_changes(output, report)?;
    if let Some(diagnostics) = &report.diagnostics {
        formatter.write_diagnostics(output, diagnostics)?;
    }
    formatter.write_selection(output, report)?;
    formatter.write_footer(output, report)
}

#[cfg(test)]
pub(crate) fn sample_report() -> SelectionReport {
    SelectionReport {
        branch: Some("feature".to_string()),
        base: Some("main".to_string()),
        changed_files: vec![FileId::new("calc.py")],
        changed_symbols: BTreeMap::from([(
            "calc.py".to_string(),
            BTreeSet::from(["add".to_string()]),
        )]),
        mode: SelectionMode::Symbols,
        selected: vec![FileId::new("tests/test_calc.py")],
        diagnostics: None,
    }
}
