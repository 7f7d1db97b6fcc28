pub mod args;
pub mod commands;

pub use args::{CheckArgs, Cli, Commands, OutputFormat, RunArgs, Verbosity};
