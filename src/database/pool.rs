//! Bounded connection pool over a DuckDB store

use super::engine::DatabaseEngine;
use crate::error::{Error, Result};
use crate::fetch::{ConnectionProvider, RangeQuery, RangeReader, RowVisitor};
use crate::types::StoredRow;
use async_trait::async_trait;
use duckdb::Connection;
use std::sync::{Arc, Mutex};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Hands out at most `pool_size` connections to one DuckDB store at a time
pub struct DuckDbPool {
    engine: Mutex<DatabaseEngine>,
    table_prefix: Option<String>,
    permits: Arc<Semaphore>,
    pool_size: u32,
}

impl DuckDbPool {
    /// Create a pool over an opened engine
    pub fn new(engine: DatabaseEngine, pool_size: u32) -> Result<Self> {
        if pool_size < 1 {
            return Err(Error::config("pool_size must be at least 1"));
        }
        let table_prefix = engine.table_prefix().map(String::from);
        Ok(Self {
            engine: Mutex::new(engine),
            table_prefix,
            permits: Arc::new(Semaphore::new(pool_size as usize)),
            pool_size,
        })
    }

    /// Number of connections that can be acquired right now
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Refuse further acquisitions; connections already out stay valid
    pub fn close(&self) {
        self.permits.close();
    }

    /// Run a check query against the store
    pub fn check_connection(&self) -> Result<()> {
        self.engine
            .lock()
            .map_err(|_| Error::pool("store engine lock poisoned"))?
            .check_connection()
    }

    fn open_connection(&self) -> Result<Connection> {
        self.engine
            .lock()
            .map_err(|_| Error::pool("store engine lock poisoned"))?
            .try_clone_connection()
    }
}

#[async_trait]
impl ConnectionProvider for DuckDbPool {
    type Connection = PooledConnection;

    async fn acquire(&self) -> Result<PooledConnection> {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::pool("connection pool is closed"))?;

        let conn = self.open_connection()?;

        Ok(PooledConnection {
            conn,
            table_prefix: self.table_prefix.clone(),
            _permit: permit,
        })
    }

    fn pool_size(&self) -> u32 {
        self.pool_size
    }
}

/// A DuckDB connection occupying one pool slot until dropped
pub struct PooledConnection {
    conn: Connection,
    table_prefix: Option<String>,
    _permit: OwnedSemaphorePermit,
}

impl RangeReader for PooledConnection {
    fn read_range(&mut self, query: &RangeQuery, visit: &mut RowVisitor<'_>) -> Result<u64> {
        let sql = query.sql(self.table_prefix.as_deref());
        tracing::debug!("Executing range query: {}", sql);

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(duckdb::params![
            query.resource_type,
            query.modulus,
            query.remainder
        ])?;

        let mut count = 0u64;
        while let Some(row) = rows.next()? {
            let stored = StoredRow {
                resource_id: row.get(0)?,
                resource_type: row.get(1)?,
                last_updated: row.get(2)?,
                resource_version: row.get(3)?,
                encoding: row.get(4)?,
                content: row.get(5)?,
            };
            count += 1;
            if !visit(stored)? {
                break;
            }
        }

        Ok(count)
    }

    fn count_resources(&mut self, resource_type: &str) -> Result<u64> {
        let sql = RangeQuery::count_sql(self.table_prefix.as_deref());
        tracing::debug!("Executing count query: {}", sql);

        let count: i64 = self
            .conn
            .query_row(&sql, duckdb::params![resource_type], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}
