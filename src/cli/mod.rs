//! CLI module for redex
//!
//! Provides command-line interface for:
//! - validate: load a configuration and its schemas
//! - explain: print the plan a JSON query compiles to

mod args;
mod commands;
mod errors;
mod io;

pub use args::{Cli, Command};
pub use commands::{explain, parse_query, run, run_command, validate};
pub use errors::{CliError, CliErrorCode, CliResult};
