//! CLI module
//!
//! Command-line interface for planning and running extractions.
//!
//! # Commands
//!
//! - `plan` - Print the partitions of one or every batch
//! - `count` - Count stored resources per type
//! - `extract` - Write every current resource version as JSON lines
//! - `check` - Test connection to the store

mod commands;
mod runner;

pub use commands::{Cli, Commands, OutputFormat};
pub use runner::Runner;
