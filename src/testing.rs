//! In-memory store used by unit tests

use crate::error::{Error, Result};
use crate::fetch::{ConnectionProvider, RangeQuery, RangeReader, RowVisitor};
use crate::types::StoredRow;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

pub(crate) struct MemoryStore {
    pub rows: Vec<(i64, StoredRow)>,
    pub permits: Arc<Semaphore>,
    pub pool_size: u32,
    pub queries: AtomicUsize,
    pub fail_reads: bool,
}

impl MemoryStore {
    pub fn new(pool_size: u32) -> Self {
        Self {
            rows: Vec::new(),
            permits: Arc::new(Semaphore::new(pool_size as usize)),
            pool_size,
            queries: AtomicUsize::new(0),
            fail_reads: false,
        }
    }

    pub fn with_row(
        mut self,
        id: i64,
        resource_type: &str,
        encoding: &str,
        content: Option<Vec<u8>>,
    ) -> Self {
        self.rows.push((
            id,
            StoredRow {
                resource_id: id.to_string(),
                resource_type: resource_type.to_string(),
                last_updated: format!("2024-01-01 00:00:{:02}", id % 60),
                resource_version: 1,
                encoding: encoding.to_string(),
                content,
            },
        ));
        self
    }

    pub fn with_patients(mut self, count: i64) -> Self {
        for id in 1..=count {
            self = self.with_row(id, "Patient", "JSON", Some(patient_json(id).into_bytes()));
        }
        self
    }

    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }
}

pub(crate) fn patient_json(id: i64) -> String {
    format!(r#"{{"resourceType":"Patient","id":"{id}"}}"#)
}

pub(crate) struct MemoryConnection {
    store: Arc<MemoryStore>,
    _permit: OwnedSemaphorePermit,
}

impl RangeReader for MemoryConnection {
    fn read_range(&mut self, query: &RangeQuery, visit: &mut RowVisitor<'_>) -> Result<u64> {
        self.store.queries.fetch_add(1, Ordering::SeqCst);
        if self.store.fail_reads {
            return Err(Error::Other("connection reset".to_string()));
        }

        let mut count = 0;
        for (id, row) in &self.store.rows {
            if row.resource_type != query.resource_type || !query.matches(*id) {
                continue;
            }
            count += 1;
            if !visit(row.clone())? {
                break;
            }
        }
        Ok(count)
    }

    fn count_resources(&mut self, resource_type: &str) -> Result<u64> {
        Ok(self
            .store
            .rows
            .iter()
            .filter(|(_, row)| row.resource_type == resource_type)
            .count() as u64)
    }
}

pub(crate) struct MemoryProvider(pub Arc<MemoryStore>);

#[async_trait]
impl ConnectionProvider for MemoryProvider {
    type Connection = MemoryConnection;

    async fn acquire(&self) -> Result<MemoryConnection> {
        let permit = Arc::clone(&self.0.permits)
            .acquire_owned()
            .await
            .map_err(|_| Error::pool("closed"))?;
        Ok(MemoryConnection {
            store: Arc::clone(&self.0),
            _permit: permit,
        })
    }

    fn pool_size(&self) -> u32 {
        self.0.pool_size
    }
}

pub(crate) async fn wait_for_permits(store: &MemoryStore, expected: usize) {
    for _ in 0..400 {
        if store.available() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!(
        "expected {expected} free slots, found {}",
        store.available()
    );
}
