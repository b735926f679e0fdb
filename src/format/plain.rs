//! Plain text output format for depper

use anyhow::Result;
use std::io::Write;

use super::{Diagnostics, Formatter, SelectionReport};

pub struct PlainFormatter;

impl Formatter for PlainFormatter {
    fn write_header(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "=== TEST IMPACT ===")?;
        if let Some(branch) = &report.branch {
            writeln!(output, "Branch: {}", branch)?;
        }
        if let Some(base) = &report.base {
            writeln!(output, "Base: {}", base)?;
        }
        writeln!(output, "Mode: {}", report.mode)?;
        writeln!(output)?;
        Ok(())
    }

    fn write_changes(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "=== CHANGED FILES ({}) ===", report.changed_files.len())?;
        for file in &report.changed_files {
            match report.changed_symbols.get(file.as_str()) {
                Some(symbols) => {
                    let names: Vec<&str> = symbols.iter().map(String::as_str).collect();
                    writeln!(output, "{} [{}]", file, names.join(", "))?;
                }
                None => writeln!(output, "{}", file)?,
            }
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_diagnostics(
        &mut self,
        output: &mut dyn Write,
        diagnostics: &Diagnostics,
    ) -> Result<()> {
        writeln!(output, "=== DEPENDENCIES ===")?;
        for report in &diagnostics.files {
            write!(output, "{}", report)?;
        }
        for report in &diagnostics.symbols {
            write!(output, "{}", report)?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_selection(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "=== SELECTED TESTS ({}) ===", report.selected.len())?;
        if report.selected.is_empty() {
            writeln!(output, "No tests affected")?;
        }
        for test in &report.selected {
            writeln!(output, "{}", test)?;
        }
        writeln!(output)?;
        Ok(())
    }

    fn write_footer(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        if let Some(command) = report.pytest_command() {
            writeln!(output, "Run: {}", command)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::{render, sample_report};

    #[test]
    fn test_plain_report() {
        let mut output = Vec::new();
        render(&mut PlainFormatter, &mut output, &sample_report()).unwrap();

        let result = String::from_utf8(output).unwrap();
        assert!(result.contains("Branch: feature"));
        assert!(result.contains("Mode: symbol-level"));
        assert!(result.contains("calc.py [add]"));
        assert!(result.contains("=== SELECTED TESTS (1) ==="));
        assert!(result.contains("Run: pytest tests/test_calc.py"));
    }

    #[test]
    fn test_plain_empty_selection() {
        let mut report = sample_report();
        report.selected.clear();
        let mut output = Vec::new();
        render(&mut PlainFormatter, &mut output, &report).unwrap();

        let result = String::from_utf8(output).unwrap();
        assert!(result.contains("No tests affected"));
        assert!(!result.contains("Run:"));
    }
}
