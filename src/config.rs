//! Configuration for critail
//!
//! Defaults can be kept in a TOML file passed with `--config`. Command line
//! flags always win over values from the file.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Deserialize;

use critail_logs::StreamType;

/// Default number of lines to show
pub const DEFAULT_TAIL_LINES: i64 = 100;

/// How retained lines are printed
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Message payload only, partial lines joined
    #[default]
    Content,
    /// Lines exactly as stored in the file
    Raw,
    /// Offsets and lengths of the retained lines as JSON
    Json,
}

/// Values read from a config file; anything missing falls back to defaults
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub tail_lines: Option<i64>,
    pub stream: Option<StreamType>,
    pub output: Option<OutputFormat>,
}

impl FileConfig {
    /// Load a config file from disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }
}

/// Effective settings for one run
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Settings {
    pub tail_lines: i64,
    pub stream: StreamType,
    pub output: OutputFormat,
}

impl Settings {
    /// Merge flags over the config file over built-in defaults
    pub fn resolve(
        file: FileConfig,
        tail_lines: Option<i64>,
        stream: Option<StreamType>,
        output: Option<OutputFormat>,
    ) -> Self {
        Self {
            tail_lines: tail_lines
                .or(file.tail_lines)
                .unwrap_or(DEFAULT_TAIL_LINES),
            stream: stream.or(file.stream).unwrap_or_default(),
            output: output.or(file.output).unwrap_or_default(),
        }
    }
}
