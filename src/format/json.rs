//! JSON output format for depper
//!
//! Sections are written as they arrive; every section but the footer leaves
//! a trailing comma, the footer writes the last field and closes the object.

use anyhow::Result;
use std::io::Write;

use super::{Diagnostics, Formatter, SelectionReport};

pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn write_header(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "{{")?;
        writeln!(output, "  \"branch\": {},", serde_json::to_string(&report.branch)?)?;
        writeln!(output, "  \"base\": {},", serde_json::to_string(&report.base)?)?;
        writeln!(output, "  \"mode\": {},", serde_json::to_string(&report.mode)?)?;
        Ok(())
    }

    fn write_changes(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(
            output,
            "  \"changed_files\": {},",
            serde_json::to_string(&report.changed_files)?
        )?;
        writeln!(
            output,
            "  \"changed_symbols\": {},",
            serde_json::to_string(&report.changed_symbols)?
        )?;
        Ok(())
    }

    fn write_diagnostics(
        &mut self,
        output: &mut dyn Write,
        diagnostics: &Diagnostics,
    ) -> Result<()> {
        writeln!(output, "  \"diagnostics\": {},", serde_json::to_string(diagnostics)?)?;
        Ok(())
    }

    fn write_selection(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(output, "  \"selected_tests\": [")?;
        for (i, test) in report.selected.iter().enumerate() {
            let comma = if i < report.selected.len() - 1 { "," } else { "" };
            writeln!(output, "    {}{}", serde_json::to_string(test)?, comma)?;
        }
        writeln!(output, "  ],")?;
        Ok(())
    }

    fn write_footer(&mut self, output: &mut dyn Write, report: &SelectionReport) -> Result<()> {
        writeln!(
            output,
            "  \"pytest_command\": {}",
            serde_json::to_string(&report.pytest_command())?
        )?;
        writeln!(output, "}}")?;
        Ok(())
    }
}
