use crate::cli::args::OutputFormat;
use crate::ToolError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = ".stubledger.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Per-ledger behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// Panic on drop when an expectation's call count was not met
    #[serde(default = "enabled")]
    pub verify_on_drop: bool,
    /// Keep a log of every dispatched call
    #[serde(default = "enabled")]
    pub record_calls: bool,
}

fn enabled() -> bool {
    true
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            verify_on_drop: true,
            record_calls: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputConfig {
    /// Default report format
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Default verbosity level (0-3)
    #[serde(default)]
    pub verbosity: Option<u8>,
}

impl Config {
    /// Load configuration from a file in the project root
    pub fn load() -> Result<Self, ToolError> {
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load configuration from `path`; a missing file yields the defaults.
    pub fn load_from(config_path: &Path) -> Result<Self, ToolError> {
        if !config_path.exists() {
            return Ok(Config::default());
        }

        let content = fs::read_to_string(config_path).map_err(|e| {
            ToolError::FileError(format!(
                "Failed to read config file {:?}: {}",
                config_path, e
            ))
        })?;

        toml::from_str(&content).map_err(|e| {
            ToolError::ConfigError(format!(
                "Failed to parse TOML config from {:?}: {}",
                config_path, e
            ))
        })
    }
}
