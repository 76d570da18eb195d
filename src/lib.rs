// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::needless_pass_by_value)]

//! # hapi-extract
//!
//! Partitioned, concurrent extraction of FHIR resources from a HAPI FHIR
//! relational store.
//!
//! ## Features
//!
//! - **Deterministic partitioning**: resource ids split into residue classes
//!   (`id mod modulus`), grouped into batches as wide as the connection pool
//! - **Streaming fetch**: each partition is read on its own pooled connection
//!   and streamed back as decoded records
//! - **Payload decoding**: plain JSON, gzip-compressed JSON and tombstones
//! - **DuckDB backend**: native DuckDB files or a HAPI PostgreSQL database
//!   attached read-only
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hapi_extract::{DatabaseEngine, DuckDbPool, ExtractionConfig, ExtractionEngine, Result};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = ExtractionConfig::from_file("extract.yaml")?;
//!     let store = DatabaseEngine::new(&config.database)?;
//!     let pool = DuckDbPool::new(store, config.extraction.pool_size)?;
//!     let engine = ExtractionEngine::new(Arc::new(pool), config.extraction.clone());
//!
//!     let stats = engine
//!         .run("Patient", |record| {
//!             println!("{}", record.payload);
//!             Ok(())
//!         })
//!         .await?;
//!     eprintln!("{} records", stats.records);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      ExtractionEngine                        │
//! │     count() → rows     run(resource_type) → ExtractionStats  │
//! └──────────────────────────────────────────────────────────────┘
//!                               │
//! ┌───────────────┬─────────────┴─────────┬──────────────────────┐
//! │   Partition   │         Fetch         │        Decode        │
//! ├───────────────┼───────────────────────┼──────────────────────┤
//! │ plan()        │ RowFetcher            │ JSON                 │
//! │ Planner       │ RecordStream          │ JSONC (gzip)         │
//! │ Descriptor    │ ConnectionProvider    │ DEL (tombstone)      │
//! └───────────────┴───────────────────────┴──────────────────────┘
//!                               │
//!                   DuckDbPool → DuckDB / PostgreSQL
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Stored rows and extracted records
pub mod types;

/// Run configuration
pub mod config;

/// Partition planning
pub mod partition;

/// Payload decoding
pub mod decode;

/// Partitioned row fetching
pub mod fetch;

/// HAPI store access via DuckDB
pub mod database;

/// Batch-by-batch extraction
pub mod engine;

/// Command-line interface
pub mod cli;

#[cfg(test)]
pub(crate) mod testing;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

// Re-export commonly used types
pub use config::{ExtractSettings, ExtractionConfig};
pub use database::{DatabaseEngine, DuckDbPool};
pub use decode::{decode_row, ResourceEncoding};
pub use engine::{ExtractionEngine, ExtractionStats};
pub use fetch::{fetch, ConnectionProvider, RangeReader, RecordStream, RowFetcher};
pub use partition::{plan, PartitionDescriptor, PartitionPlanner, PlannerConfig};
