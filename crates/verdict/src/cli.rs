//! Command line arguments of a test binary

use crate::config::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

/// Run the tests registered in this binary.
///
/// ENVIRONMENT VARIABLES:
///     VERDICT_PARALLEL    Set to '1' to run files on the thread pool
///     VERDICT_FORMAT      'human' or 'json'
///     VERDICT_NO_COLOR    Set to '1' to disable colored output
///     NO_COLOR            Set to disable colored output
///     VERDICT_LOG         Log filter (default: warn)
#[derive(Parser, Debug, Clone, Default)]
#[command(version)]
pub struct Args {
    /// Only run tests whose name contains this pattern
    pub filter: Option<String>,
    /// Run test files on the thread pool instead of one at a time
    #[arg(long)]
    pub parallel: bool,
    /// Report format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
    /// Only print failures and the summary
    #[arg(long, short = 'q')]
    pub quiet: bool,
    /// Use this configuration file instead of searching for verdict.toml
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
    #[command(flatten)]
    pub harness: HarnessFlags,
}

/// Flags `cargo test` forwards to every test binary; accepted and ignored.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct HarnessFlags {
    #[arg(long, hide = true)]
    pub nocapture: bool,
    #[arg(long, hide = true)]
    pub show_output: bool,
    #[arg(long, hide = true, value_name = "N")]
    pub test_threads: Option<usize>,
    #[arg(long, hide = true)]
    pub exact: bool,
    #[arg(long, hide = true)]
    pub ignored: bool,
    #[arg(long, hide = true)]
    pub include_ignored: bool,
}
