//! Engine types
//!
//! Statistics reported by an extraction run.

use serde::Serialize;

/// Statistics from extracting one resource type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    /// Resource type extracted
    pub resource_type: String,
    /// Row count reported by the store before the run
    pub rows_estimated: u64,
    /// Records emitted, tombstones included
    pub records: u64,
    /// Tombstone records emitted
    pub tombstones: u64,
    /// Batches run
    pub batches: u32,
    /// Partitions read to the end
    pub partitions_completed: u32,
    /// Partitions that ended in an error
    pub partitions_failed: u32,
    /// Duration in milliseconds
    pub duration_ms: u64,
}

impl ExtractionStats {
    /// Create new stats
    pub fn new(resource_type: impl Into<String>) -> Self {
        Self {
            resource_type: resource_type.into(),
            ..Self::default()
        }
    }

    /// Count an emitted record
    pub fn add_record(&mut self, deleted: bool) {
        self.records += 1;
        if deleted {
            self.tombstones += 1;
        }
    }

    /// Add a batch
    pub fn add_batch(&mut self) {
        self.batches += 1;
    }

    /// Add a completed partition
    pub fn add_partition(&mut self) {
        self.partitions_completed += 1;
    }

    /// Add a failed partition
    pub fn add_failure(&mut self) {
        self.partitions_failed += 1;
    }

    /// Set duration
    pub fn set_duration(&mut self, ms: u64) {
        self.duration_ms = ms;
    }
}
