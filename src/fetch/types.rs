//! Fetcher traits and the record stream

use super::query::RangeQuery;
use crate::error::Result;
use crate::partition::PartitionDescriptor;
use crate::types::{ExtractedRecord, StoredRow};
use async_trait::async_trait;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;

/// Callback receiving rows from a range read
///
/// Returning `Ok(false)` stops the read early; an error aborts it.
pub type RowVisitor<'a> = dyn FnMut(StoredRow) -> Result<bool> + 'a;

/// A store connection able to run a parameterized range query
pub trait RangeReader {
    /// Run `query`, handing each row to `visit` in scan order
    ///
    /// Returns the number of rows handed out.
    fn read_range(&mut self, query: &RangeQuery, visit: &mut RowVisitor<'_>) -> Result<u64>;

    /// Count stored resources of one type
    fn count_resources(&mut self, resource_type: &str) -> Result<u64>;
}

/// A bounded source of store connections
///
/// A connection holds its pool slot until it is dropped.
#[async_trait]
pub trait ConnectionProvider: Send + Sync + 'static {
    /// Connection type handed out by this provider
    type Connection: RangeReader + Send + 'static;

    /// Wait for a free slot and open a connection in it
    async fn acquire(&self) -> Result<Self::Connection>;

    /// Maximum number of connections checked out at once
    fn pool_size(&self) -> u32;
}

/// Lazy, single-pass stream of the decoded records of one partition
///
/// Ends after the first error. Dropping it stops the underlying read.
#[derive(Debug)]
pub struct RecordStream {
    descriptor: PartitionDescriptor,
    receiver: mpsc::Receiver<Result<ExtractedRecord>>,
    finished: bool,
}

impl RecordStream {
    pub(crate) fn new(
        descriptor: PartitionDescriptor,
        receiver: mpsc::Receiver<Result<ExtractedRecord>>,
    ) -> Self {
        Self {
            descriptor,
            receiver,
            finished: false,
        }
    }

    /// The partition this stream reads
    pub fn descriptor(&self) -> &PartitionDescriptor {
        &self.descriptor
    }

    /// Drain the stream, returning every record or the first error
    pub async fn collect_records(self) -> Result<Vec<ExtractedRecord>> {
        self.try_collect().await
    }
}

impl Stream for RecordStream {
    type Item = Result<ExtractedRecord>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.finished {
            return Poll::Ready(None);
        }

        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Err(e))) => {
                self.finished = true;
                self.receiver.close();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                self.finished = true;
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
