//! Partition planner
//!
//! Turns run parameters into partition descriptors.

use super::types::{PartitionDescriptor, PlannerConfig};
use crate::error::{Error, Result};

/// Plan the partitions of one batch
///
/// Returns exactly `pool_size` descriptors sharing
/// `modulus = batch_count * pool_size`, with remainders
/// `batch_number * pool_size .. (batch_number + 1) * pool_size`.
pub fn plan(
    resource_type: &str,
    pool_size: u32,
    batch_count: u32,
    batch_number: u32,
) -> Result<Vec<PartitionDescriptor>> {
    let config = PlannerConfig::new(pool_size, batch_count)?;
    PartitionPlanner::new(config).plan_batch(resource_type, batch_number)
}

/// Planner bound to one run's configuration
#[derive(Debug, Clone, Copy)]
pub struct PartitionPlanner {
    config: PlannerConfig,
}

impl PartitionPlanner {
    /// Create a planner
    pub fn new(config: PlannerConfig) -> Self {
        Self { config }
    }

    /// Get the planner configuration
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Plan the partitions of batch `batch_number`
    pub fn plan_batch(
        &self,
        resource_type: &str,
        batch_number: u32,
    ) -> Result<Vec<PartitionDescriptor>> {
        self.config.validate()?;
        let PlannerConfig {
            pool_size,
            batch_count,
        } = self.config;

        if batch_number >= batch_count {
            return Err(Error::config(format!(
                "batch_number {batch_number} out of range for batch_count {batch_count}"
            )));
        }

        let modulus = self.config.modulus()?;
        let base = batch_number * pool_size;

        Ok((0..pool_size)
            .map(|i| PartitionDescriptor {
                resource_type: resource_type.to_string(),
                modulus,
                remainder: base + i,
            })
            .collect())
    }

    /// Plan every batch of the run, in batch order
    pub fn plan_run(&self, resource_type: &str) -> Result<Vec<Vec<PartitionDescriptor>>> {
        (0..self.config.batch_count)
            .map(|batch| self.plan_batch(resource_type, batch))
            .collect()
    }
}
