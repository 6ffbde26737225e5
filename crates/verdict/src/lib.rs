//! Verdict - test binary launcher
//!
//! A test binary builds its [`DiscoveryTree`] and hands it to [`main`]:
//!
//! ```no_run
//! use std::process::ExitCode;
//! use verdict::{types, DiscoveryTree, TestCase};
//!
//! fn main() -> ExitCode {
//!     let mut tree = DiscoveryTree::new();
//!     tree.file(
//!         None,
//!         "test_types",
//!         vec![TestCase::new("test_bool_is_int", |t| {
//!             t.assert_subtype(types::bool(), types::int())
//!         })],
//!     );
//!     verdict::main(tree)
//! }
//! ```

pub mod cli;
pub mod config;
pub mod testing;

pub use verdict_core::*;

use anyhow::{Context, Result};
use clap::Parser;
use cli::Args;
use colored::Colorize;
use config::{HarnessConfig, OutputFormat, Settings};
use std::io;
use std::process::ExitCode;
use testing::{DefaultEventFormatter, JsonEventWriter};
use tracing::debug;

/// Parse the command line, run every test in `tree` and report.
pub fn main(tree: DiscoveryTree) -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(error) => {
            let _ = error.print();
            return if error.use_stderr() {
                ExitCode::from(2)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    launch(&tree, &args)
}

/// Run with already parsed arguments and map the outcome to an exit status.
pub fn launch(tree: &DiscoveryTree, args: &Args) -> ExitCode {
    init_tracing();

    match run(tree, args) {
        Ok(context) => exit_code(&context),
        Err(error) => {
            eprintln!("{} {:#}", "error:".red().bold(), error);
            ExitCode::from(2)
        }
    }
}

/// Run and return the finished context.
pub fn run(tree: &DiscoveryTree, args: &Args) -> Result<TestingContext> {
    let config = load_config(args)?;
    let settings = Settings::resolve(&config, args);
    debug!(?settings, "resolved settings");

    let mut manager = EventHandlerManager::new();
    match settings.format {
        OutputFormat::Human => {
            DefaultEventFormatter::new(io::stdout())
                .with_color(settings.color)
                .with_quiet(settings.quiet)
                .install(&mut manager);
        }
        OutputFormat::Json => {
            JsonEventWriter::new(io::stdout()).install(&mut manager);
        }
    }

    let mut engine = TestEngine::new().with_parallel(settings.parallel);
    if let Some(filter) = &settings.filter {
        engine = engine.with_filter(filter.as_str());
    }

    engine
        .run(tree, &mut manager)
        .context("test run aborted")
}

fn load_config(args: &Args) -> Result<HarnessConfig> {
    let config = match &args.config {
        Some(path) => HarnessConfig::load_from_file(path)?,
        None => {
            let cwd = std::env::current_dir().context("cannot read working directory")?;
            let (found, config) = HarnessConfig::discover(&cwd)?;
            if let Some(path) = found {
                debug!(path = %path.display(), "loaded configuration");
            }
            config
        }
    };
    Ok(config.apply_env_overrides()?)
}

/// Install the log subscriber; `VERDICT_LOG` holds the filter.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("VERDICT_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

/// Process exit status for a finished run.
pub fn exit_code(context: &TestingContext) -> ExitCode {
    if context.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
