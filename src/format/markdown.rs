//! Markdown output format for depper, suitable for CI job summaries

use anyhow::Result;
use std::io::Write;

use super::{Diagnostics, Formatter, SelectionReport};

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn write_header(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "# Test Impact")?;
        writeln!(output)?;
        if let Some(branch) = &report.branch {
            writeln!(output, "> **Branch:** `{}`", branch)?;
        }
        if let Some(base) = &report.base {
            writeln!(output, "> **Base:** `{}`", base)?;
        }
        writeln!(output, "> **Mode:** {}", report.mode)?;
        writeln!(output)?;
        Ok(())
    }

    fn write_changes(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "## Changed Files")?;
        writeln!(output)?;
        if report.changed_files.is_empty() {
            writeln!(output, "_None_")?;
            writeln!(output)?;
            return Ok(());
        }
        writeln!(output, "| File | Changed symbols |")?;
        writeln!(output, "|------|-----------------|")?;
        for file in &report.changed_files {
            let symbols = report
                .changed_symbols
                .get(file.as_str())
                .map(|names| {
                    names
                        .iter()
                        .map(|n| format!("`{}`", n))
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default();
            writeln!(output, "| `{}` | {} |", file, symbols)?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_diagnostics(
        &mut self,
        output: &mut dyn Write,
        diagnostics: &Diagnostics,
    ) -> Result<()> {
        writeln!(output, "## Dependencies")?;
        writeln!(output)?;
        writeln!(output, "```text")?;
        for report in &diagnostics.files {
            write!(output, "{}", report)?;
        }
        for report in &diagnostics.symbols {
            write!(output, "{}", report)?;
        }
        writeln!(output, "```")?;
        writeln!(output)?;
        Ok(())
    }

    fn write_selection(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "## Selected Tests ({})", report.selected.len())?;
        writeln!(output)?;
        if report.selected.is_empty() {
            writeln!(output, "_No tests affected_")?;
        }
        for test in &report.selected {
            writeln!(output, "- `{}`", test)?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_footer(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        if let Some(command) = report.pytest_command() {
            writeln!(output, "```bash")?;
            writeln!(output, "{}", command)?;
            writeln!(output, "```")?;
        }
        Ok(())
    }
}
