//! Extraction engine module
//!
//! Runs a whole resource type through the planner and the fetcher.
//!
//! # Overview
//!
//! The engine provides:
//! - `ExtractionEngine` - counts rows, plans batches, and fans each batch out
//!   to one concurrent fetch per partition
//! - `ExtractionStats` - what a run produced
//!
//! Batches run one after another. Inside a batch every partition is fetched
//! at once and the record streams are merged, so at most `pool_size`
//! connections are busy at any time.

mod types;

pub use types::ExtractionStats;

use crate::config::ExtractSettings;
use crate::error::Result;
use crate::fetch::{ConnectionProvider, RangeReader, RowFetcher};
use crate::partition::{PartitionDescriptor, PartitionPlanner};
use crate::types::ExtractedRecord;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;

/// Extraction engine for one store
pub struct ExtractionEngine<P: ConnectionProvider> {
    /// Partition fetcher
    fetcher: RowFetcher<P>,
    /// Run settings
    settings: ExtractSettings,
}

impl<P: ConnectionProvider> ExtractionEngine<P> {
    /// Create a new engine over a connection provider
    pub fn new(provider: Arc<P>, settings: ExtractSettings) -> Self {
        let fetcher = RowFetcher::new(provider).with_channel_capacity(settings.channel_capacity);
        Self { fetcher, settings }
    }

    /// Count stored resources of one type
    pub async fn count(&self, resource_type: &str) -> Result<u64> {
        let mut connection = self.fetcher.provider().acquire().await?;
        let resource_type = resource_type.to_string();
        tokio::task::spawn_blocking(move || connection.count_resources(&resource_type)).await?
    }

    /// Build the planner for a resource type with `row_count` rows
    ///
    /// Batches are as wide as the connection pool.
    pub fn planner(&self, row_count: u64) -> Result<PartitionPlanner> {
        let pool_size = self.fetcher.provider().pool_size();
        let config = self.settings.planner_config(pool_size, row_count)?;
        Ok(PartitionPlanner::new(config))
    }

    /// Extract every current version of one resource type
    ///
    /// `on_record` sees each record once, in no particular order. An error
    /// returned from it aborts the run.
    pub async fn run<F>(&self, resource_type: &str, mut on_record: F) -> Result<ExtractionStats>
    where
        F: FnMut(ExtractedRecord) -> Result<()>,
    {
        let start = Instant::now();
        let mut stats = ExtractionStats::new(resource_type);

        stats.rows_estimated = self.count(resource_type).await?;
        let planner = self.planner(stats.rows_estimated)?;
        let batch_count = planner.config().batch_count;

        tracing::info!(
            resource_type,
            rows = stats.rows_estimated,
            batches = batch_count,
            pool_size = planner.config().pool_size,
            "Starting extraction"
        );

        for batch in 0..batch_count {
            let descriptors = planner.plan_batch(resource_type, batch)?;
            self.run_batch(descriptors, &mut stats, &mut on_record)
                .await?;
            stats.add_batch();

            tracing::info!(
                resource_type,
                batch = batch + 1,
                batches = batch_count,
                records = stats.records,
                "Batch finished"
            );
        }

        stats.set_duration(start.elapsed().as_millis() as u64);

        tracing::info!(
            resource_type,
            records = stats.records,
            tombstones = stats.tombstones,
            failed_partitions = stats.partitions_failed,
            duration_ms = stats.duration_ms,
            "Extraction finished"
        );

        Ok(stats)
    }

    async fn run_batch<F>(
        &self,
        descriptors: Vec<PartitionDescriptor>,
        stats: &mut ExtractionStats,
        on_record: &mut F,
    ) -> Result<()>
    where
        F: FnMut(ExtractedRecord) -> Result<()>,
    {
        // Each partition stream is tagged with its remainder and followed by
        // an end marker, so completions can be told apart after merging.
        let streams = descriptors.into_iter().map(|descriptor| {
            let remainder = descriptor.remainder;
            self.fetcher
                .fetch_partition(descriptor)
                .map(move |item| (remainder, Some(item)))
                .chain(stream::once(futures::future::ready((remainder, None))))
        });

        let mut merged = stream::select_all(streams);
        let mut failed = HashSet::new();

        while let Some((remainder, item)) = merged.next().await {
            match item {
                Some(Ok(record)) => {
                    stats.add_record(record.is_deleted());
                    on_record(record)?;
                }
                Some(Err(e)) if self.settings.fail_fast => return Err(e),
                Some(Err(e)) => {
                    tracing::warn!(
                        resource_type = %stats.resource_type,
                        remainder,
                        error = %e,
                        "Partition failed, continuing"
                    );
                    failed.insert(remainder);
                    stats.add_failure();
                }
                None if !failed.contains(&remainder) => stats.add_partition(),
                None => {}
            }
        }

        Ok(())
    }
}
