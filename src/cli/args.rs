use crate::config::Config;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "stubledger")]
#[command(about = "Run call-expectation scenarios against a scripted substitute", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Increase log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            Verbosity::from_level(self.verbose)
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run a scenario file and report every scripted call
    Run(RunArgs),

    /// Parse a scenario file and register its expectations without running calls
    Check(CheckArgs),
}

#[derive(Parser)]
pub struct RunArgs {
    /// Path to the scenario TOML file
    pub scenario: PathBuf,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl RunArgs {
    /// Fill unset options from the configuration file.
    pub fn merge_config(&mut self, config: &Config) {
        if self.format.is_none() {
            self.format = config.output.format;
        }
    }

    pub fn format(&self) -> OutputFormat {
        self.format.unwrap_or_default()
    }
}

#[derive(Parser)]
pub struct CheckArgs {
    /// Path to the scenario TOML file
    pub scenario: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
    Trace,
}

impl Verbosity {
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Verbosity::Normal,
            1 => Verbosity::Verbose,
            _ => Verbosity::Trace,
        }
    }

    pub fn to_log_level(self) -> &'static str {
        match self {
            Verbosity::Quiet => "error",
            Verbosity::Normal => "info",
            Verbosity::Verbose => "debug",
            Verbosity::Trace => "trace",
        }
    }
}
