//! Partition fetch implementation

use super::query::RangeQuery;
use super::types::{ConnectionProvider, RangeReader, RecordStream};
use crate::decode::decode_row;
use crate::error::{Error, Result};
use crate::partition::PartitionDescriptor;
use crate::types::ExtractedRecord;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Records buffered between the reader thread and the consumer
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

type RecordSender = mpsc::Sender<Result<ExtractedRecord>>;

/// Fetch one partition over an already-acquired connection
///
/// The connection is moved into the reader and dropped when the read ends,
/// whichever way it ends. Must be called from within a Tokio runtime.
pub fn fetch<C>(
    connection: C,
    descriptor: PartitionDescriptor,
    channel_capacity: usize,
) -> RecordStream
where
    C: RangeReader + Send + 'static,
{
    let (tx, rx) = mpsc::channel(channel_capacity.max(1));
    match RangeQuery::for_partition(&descriptor) {
        Ok(query) => {
            tokio::spawn(run_reader(connection, query, tx));
        }
        Err(e) => reject(&tx, &descriptor, e),
    }
    RecordStream::new(descriptor, rx)
}

/// Fetches partitions using connections from a pool
pub struct RowFetcher<P: ConnectionProvider> {
    provider: Arc<P>,
    channel_capacity: usize,
}

impl<P: ConnectionProvider> Clone for RowFetcher<P> {
    fn clone(&self) -> Self {
        Self {
            provider: Arc::clone(&self.provider),
            channel_capacity: self.channel_capacity,
        }
    }
}

impl<P: ConnectionProvider> RowFetcher<P> {
    /// Create a fetcher over a connection provider
    pub fn new(provider: Arc<P>) -> Self {
        Self {
            provider,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Set the number of records buffered per partition
    #[must_use]
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity.max(1);
        self
    }

    /// Get the connection provider
    pub fn provider(&self) -> &Arc<P> {
        &self.provider
    }

    /// Fetch one partition, acquiring a pool slot for its duration
    ///
    /// Waiting for a slot is abandoned if the stream is dropped first. A
    /// malformed descriptor yields one error without touching the pool.
    pub fn fetch_partition(&self, descriptor: PartitionDescriptor) -> RecordStream {
        let (tx, rx) = mpsc::channel(self.channel_capacity);
        let query = match RangeQuery::for_partition(&descriptor) {
            Ok(query) => query,
            Err(e) => {
                reject(&tx, &descriptor, e);
                return RecordStream::new(descriptor, rx);
            }
        };
        let provider = Arc::clone(&self.provider);

        tokio::spawn(async move {
            let acquired = tokio::select! {
                acquired = provider.acquire() => acquired,
                () = tx.closed() => return,
            };

            match acquired {
                Ok(connection) => run_reader(connection, query, tx).await,
                Err(e) => {
                    let _ = tx.send(Err(e)).await;
                }
            }
        });

        RecordStream::new(descriptor, rx)
    }
}

/// Queue the only item of a partition that will never be queried
fn reject(tx: &RecordSender, descriptor: &PartitionDescriptor, error: Error) {
    tracing::debug!(
        resource_type = %descriptor.resource_type,
        modulus = descriptor.modulus,
        remainder = descriptor.remainder,
        error = %error,
        "Partition rejected before query"
    );
    let _ = tx.try_send(Err(error));
}

async fn run_reader<C>(connection: C, query: RangeQuery, tx: RecordSender)
where
    C: RangeReader + Send + 'static,
{
    let failure_tx = tx.clone();
    let reader = tokio::task::spawn_blocking(move || read_partition(connection, &query, &tx));

    if let Err(e) = reader.await {
        let _ = failure_tx.send(Err(e.into())).await;
    }
}

fn read_partition<C: RangeReader>(mut connection: C, query: &RangeQuery, tx: &RecordSender) {
    let mut abandoned = false;

    let result = connection.read_range(query, &mut |row| {
        let decoded = decode_row(row);
        let keep_reading = decoded.is_ok();
        if tx.blocking_send(decoded).is_err() {
            abandoned = true;
            return Ok(false);
        }
        Ok(keep_reading)
    });

    match result {
        Ok(rows) if abandoned => tracing::debug!(
            resource_type = %query.resource_type,
            modulus = query.modulus,
            remainder = query.remainder,
            rows,
            "Partition fetch abandoned by consumer"
        ),
        Ok(rows) => tracing::debug!(
            resource_type = %query.resource_type,
            modulus = query.modulus,
            remainder = query.remainder,
            rows,
            "Partition fetch finished"
        ),
        Err(e) => {
            tracing::debug!(
                resource_type = %query.resource_type,
                modulus = query.modulus,
                remainder = query.remainder,
                error = %e,
                "Partition fetch failed"
            );
            let _ = tx.blocking_send(Err(e));
        }
    }
    // `connection` drops here, returning its pool slot.
}
