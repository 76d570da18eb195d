//! HAPI store access via DuckDB
//!
//! This module provides database connectivity using DuckDB as the query engine.
//! A HAPI PostgreSQL database is attached read-only through DuckDB's postgres
//! extension; a DuckDB file or in-memory database can be read directly.

mod engine;
mod pool;

pub use engine::DatabaseEngine;
pub use pool::{DuckDbPool, PooledConnection};
