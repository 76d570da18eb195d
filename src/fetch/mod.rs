//! Partitioned row fetcher
//!
//! # Overview
//!
//! One fetch reads one partition: a single range query against the store,
//! with every row decoded on the way out. The store side is abstracted by
//! [`RangeReader`] (a connection that can run a range query) and
//! [`ConnectionProvider`] (a bounded pool of such connections).
//!
//! Reading happens on a blocking thread and records are handed to the
//! consumer through a bounded channel, so a [`RecordStream`] never buffers
//! a whole partition. The connection travels with the reader and is dropped
//! when the partition ends, fails, or the stream is dropped.

mod fetcher;
mod query;
mod types;

pub use fetcher::{fetch, RowFetcher, DEFAULT_CHANNEL_CAPACITY};
pub use query::RangeQuery;
pub use types::{ConnectionProvider, RangeReader, RecordStream, RowVisitor};
