//! Harness configuration (verdict.toml)
//!
//! Settings are merged in the following order (later overrides earlier):
//! 1. `verdict.toml`, found by walking up from the working directory
//! 2. Environment variables (`VERDICT_*`, `NO_COLOR`)
//! 3. CLI flags (applied by [`Settings::resolve`])

use crate::cli::Args;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

/// Name of the configuration file
pub const CONFIG_FILE_NAME: &str = "verdict.toml";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Report format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Tree of results with a closing summary
    #[default]
    Human,
    /// One JSON object per event
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "human" => Ok(OutputFormat::Human),
            "json" => Ok(OutputFormat::Json),
            other => Err(format!("expected 'human' or 'json', got '{}'", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Human => f.write_str("human"),
            OutputFormat::Json => f.write_str("json"),
        }
    }
}

/// Contents of verdict.toml
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HarnessConfig {
    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

/// `[run]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    /// Run files on the thread pool (default: false)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel: Option<bool>,
}

/// `[output]` section
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// Colorize the human report (default: true)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,
}

impl HarnessConfig {
    /// Load configuration from a file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::IoError(e)
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// Find verdict.toml by walking up from `start_dir`.
    ///
    /// Returns the file used, if any, and the parsed configuration.
    pub fn discover(start_dir: &Path) -> ConfigResult<(Option<PathBuf>, Self)> {
        let mut current = start_dir.to_path_buf();

        loop {
            let config_path = current.join(CONFIG_FILE_NAME);
            if config_path.is_file() {
                let config = Self::load_from_file(&config_path)?;
                return Ok((Some(config_path), config));
            }

            match current.parent() {
                Some(parent) => current = parent.to_path_buf(),
                None => return Ok((None, Self::default())),
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// - `VERDICT_PARALLEL`: run files on the thread pool when truthy
    /// - `VERDICT_FORMAT`: `human` or `json`
    /// - `VERDICT_NO_COLOR`, `NO_COLOR`: disable colors
    pub fn apply_env_overrides(mut self) -> ConfigResult<Self> {
        if let Ok(parallel) = env::var("VERDICT_PARALLEL") {
            self.run.parallel = Some(is_truthy(&parallel));
        }

        if let Ok(format) = env::var("VERDICT_FORMAT") {
            let format = format
                .parse::<OutputFormat>()
                .map_err(|reason| ConfigError::InvalidValue {
                    field: "VERDICT_FORMAT".to_string(),
                    reason,
                })?;
            self.output.format = Some(format);
        }

        let no_color = env::var("VERDICT_NO_COLOR")
            .map(|v| is_truthy(&v))
            .unwrap_or(false)
            || env::var("NO_COLOR").map(|v| !v.is_empty()).unwrap_or(false);
        if no_color {
            self.output.color = Some(false);
        }

        Ok(self)
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// Effective settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub parallel: bool,
    pub color: bool,
    pub format: OutputFormat,
    pub quiet: bool,
    pub filter: Option<String>,
}

impl Settings {
    /// Layer CLI flags over the loaded configuration.
    pub fn resolve(config: &HarnessConfig, args: &Args) -> Self {
        Self {
            parallel: args.parallel || config.run.parallel.unwrap_or(false),
            color: !args.no_color && config.output.color.unwrap_or(true),
            format: args
                .format
                .or(config.output.format)
                .unwrap_or_default(),
            quiet: args.quiet,
            filter: args.filter.clone(),
        }
    }
}
