//! CLI commands and argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Partitioned extraction of HAPI FHIR resources
#[derive(Parser, Debug)]
#[command(name = "hapi-extract")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (YAML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Output format for status messages
    #[arg(short, long, global = true, default_value = "json")]
    pub format: OutputFormat,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print partition descriptors (no store needed)
    Plan {
        /// Resource type to partition
        #[arg(short, long)]
        resource_type: String,

        /// Concurrent partitions per batch
        #[arg(long)]
        pool_size: u32,

        /// Number of batches
        #[arg(long)]
        batch_count: u32,

        /// Batch to print (all batches when omitted)
        #[arg(long)]
        batch_number: Option<u32>,
    },

    /// Count stored resources per type
    Count {
        /// Resource types (comma-separated, overrides the config file)
        #[arg(long)]
        resource_types: Option<String>,
    },

    /// Extract current resource versions as JSON lines
    Extract {
        /// Resource types (comma-separated, overrides the config file)
        #[arg(long)]
        resource_types: Option<String>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Test connection to the store
    Check,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output (one message per line)
    Json,
    /// Human-readable output
    Pretty,
}
