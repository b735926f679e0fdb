use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use crate::config::DepperConfig;
use crate::core::FileId;
use crate::format::{Diagnostics, SelectionMode, SelectionReport, create_formatter, render};
use crate::git::{self, ChangeSet};
use crate::session::Session;
use crate::utils::analysis::symbols::{SymbolChanges, changed_symbols};

/// Where the list of changes comes from.
#[derive(Debug, Clone)]
pub enum ChangeSource {
    /// Diff the working tree against the configured base branch.
    Git,
    /// Explicit project-relative paths; no line information.
    Files(Vec<String>),
    /// A unified diff file, `-` for stdin.
    Patch(PathBuf),
}

/// Main entry point in CLI mode: select tests and print the report to stdout.
pub fn run(config: DepperConfig, source: ChangeSource) -> Result<()> {
    let report = select_tests(&config, &source)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if config.list_only {
        for test in &report.selected {
            writeln!(out, "{}", test)?;
        }
    } else {
        let mut formatter = create_formatter(config.output_format);
        render(formatter.as_mut(), &mut out, &report)?;
    }
    out.flush()?;
    Ok(())
}

/// Builds a session for the configured root and decides which tests to run.
pub fn select_tests(config: &DepperConfig, source: &ChangeSource) -> Result<SelectionReport> {
    config.validate()?;
    let root = config.root.as_path();

    let changes = collect_changes(config, source)?;
    tracing::info!(files = changes.files.len(), "changes collected");

    let session = Session::build(root, &config.exclude, &config.test_patterns)
        .with_context(|| format!("Failed to analyze {:?}", root))?;

    let changed_files: Vec<FileId> = changes.files.iter().cloned().collect();
    let symbol_changes = if config.files_only {
        SymbolChanges::default()
    } else {
        changed_symbols(root, &changes.added_lines)
    };

    let (mut mode, mut selected) = if symbol_changes.symbols.is_empty() {
        (SelectionMode::Files, session.affected_tests(&changed_files))
    } else {
        (SelectionMode::Symbols, select_by_symbols(&session, &changed_files, &symbol_changes))
    };
    let symbols = symbol_changes.symbols;

    if selected.is_empty() && config.run_all_on_empty {
        tracing::info!("nothing affected, selecting every test");
        mode = SelectionMode::All;
        selected = session.test_files();
    }

    let diagnostics = config.debug.then(|| Diagnostics {
        files: session.explain(&changed_files),
        symbols: session.explain_symbols(&symbols),
    });

    Ok(SelectionReport {
        branch: git::current_branch(root),
        base: matches!(source, ChangeSource::Git).then(|| config.base_branch.clone()),
        changed_files,
        changed_symbols: symbols,
        mode,
        selected: selected.into_iter().collect(),
        diagnostics,
    })
}

/// Symbol-level selection for files with known changed symbols, file-level
/// selection for files without symbols or with module-level edits, and every
/// changed test file itself.
fn select_by_symbols(
    session: &Session,
    changed_files: &[FileId],
    changes: &SymbolChanges,
) -> BTreeSet<FileId> {
    let mut selected = session.affected_tests_by_symbols(&changes.symbols);

    let file_level: Vec<&FileId> = changed_files
        .iter()
        .filter(|file| {
            !changes.symbols.contains_key(file.as_str())
                || changes.module_level.contains(file.as_str())
        })
        .collect();
    selected.extend(session.affected_tests(&file_level));

    selected.extend(
        changed_files
            .iter()
            .filter(|file| session.is_test(file.as_str()))
            .cloned(),
    );
    selected
}

pub fn collect_changes(config: &DepperConfig, source: &ChangeSource) -> Result<ChangeSet> {
    let root = config.root.as_path();
    match source {
        ChangeSource::Git => git::changed_files(root, &config.base_branch)
            .with_context(|| format!("Failed to diff against {}", config.base_branch)),
        ChangeSource::Files(files) => {
            let mut changes = ChangeSet::default();
            changes
                .files
                .extend(files.iter().map(FileId::new).filter(|f| !f.as_str().is_empty()));
            Ok(changes)
        }
        ChangeSource::Patch(path) => {
            let text = read_patch(path)?;
            let mut changes = git::parse_unified_diff(&text);
            changes.retain_existing(root);
            Ok(changes)
        }
    }
}

fn read_patch(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read diff from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path).with_context(|| format!("Failed to read diff {:?}", path))
}
