use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use depper::config::OutputFormat;
use depper::runner::ChangeSource;
use depper::{DepperConfig, run};
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CliOutputFormat {
    Plain,
    Json,
    Md,
}

impl From<CliOutputFormat> for OutputFormat {
    fn from(f: CliOutputFormat) -> Self {
        match f {
            CliOutputFormat::Plain => OutputFormat::Plain,
            CliOutputFormat::Json => OutputFormat::Json,
            CliOutputFormat::Md => OutputFormat::Markdown,
        }
    }
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Select the Python tests affected by a change", long_about = None)]
struct Args {
    /// Project root to analyze
    path: Option<PathBuf>,

    /// Branch to compare against
    #[arg(long)]
    base_branch: Option<String>,

    /// Changed files (skips git)
    #[arg(long, num_args = 1.., conflicts_with = "patch")]
    changed: Vec<String>,

    /// Read changes from a unified diff file ("-" for stdin)
    #[arg(long)]
    patch: Option<PathBuf>,

    /// Select by changed files only, ignoring changed symbols
    #[arg(long)]
    files_only: bool,

    /// Print dependency diagnostics for every change
    #[arg(long)]
    debug: bool,

    /// Print only the selected test files, one per line
    #[arg(long)]
    list_only: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<CliOutputFormat>,

    /// Add exclusion pattern (path substring)
    #[arg(long)]
    exclude: Vec<String>,

    /// Replace the test file markers (path substring)
    #[arg(long)]
    test_pattern: Vec<String>,

    /// Select every test when nothing is affected
    #[arg(long)]
    run_all_on_empty: bool,

    /// Verbose logging (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) {
    use tracing_subscriber::EnvFilter;

    let level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let root = args.path.clone().unwrap_or_else(|| PathBuf::from("."));

    // 1. Load from file or default
    let mut config = DepperConfig::load_from_dir(&root)?.unwrap_or_default();
    config.root = root;

    // 2. Override with CLI args
    if let Some(base) = args.base_branch {
        config.base_branch = base;
    }
    if let Some(f) = args.format {
        config.output_format = f.into();
    }
    if !args.exclude.is_empty() {
        // CLI exclusions ADD to config exclusions
        config.exclude.extend(args.exclude);
    }
    if !args.test_pattern.is_empty() {
        config.test_patterns = args.test_pattern;
    }
    config.files_only |= args.files_only;
    config.debug |= args.debug;
    config.list_only |= args.list_only;
    config.run_all_on_empty |= args.run_all_on_empty;

    let source = if let Some(patch) = args.patch {
        ChangeSource::Patch(patch)
    } else if !args.changed.is_empty() {
        ChangeSource::Files(args.changed)
    } else {
        ChangeSource::Git
    };

    run(config, source)
}
