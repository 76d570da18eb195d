//! Partition types
//!
//! Defines the partition descriptor and the planner configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// A single unit of extraction work
///
/// Selects every resource of `resource_type` whose id satisfies
/// `id % modulus == remainder`. Deserialized descriptors are validated like
/// [`PartitionDescriptor::new`]; fetches re-check descriptors built from
/// the public fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DescriptorFields")]
pub struct PartitionDescriptor {
    /// Resource type this partition reads
    pub resource_type: String,
    /// Total number of partitions in the run
    pub modulus: u32,
    /// Residue class assigned to this partition, in `[0, modulus)`
    pub remainder: u32,
}

impl PartitionDescriptor {
    /// Create a descriptor, checking `remainder < modulus`
    pub fn new(resource_type: impl Into<String>, modulus: u32, remainder: u32) -> Result<Self> {
        let descriptor = Self {
            resource_type: resource_type.into(),
            modulus,
            remainder,
        };
        descriptor.validate()?;
        Ok(descriptor)
    }

    /// Check `modulus >= 1` and `remainder < modulus`
    pub fn validate(&self) -> Result<()> {
        if self.modulus == 0 {
            return Err(Error::config("modulus must be at least 1"));
        }
        if self.remainder >= self.modulus {
            return Err(Error::config(format!(
                "remainder {} out of range for modulus {}",
                self.remainder, self.modulus
            )));
        }
        Ok(())
    }

    /// Whether a resource id falls into this partition
    pub fn contains(&self, resource_id: i64) -> bool {
        self.modulus != 0
            && resource_id.rem_euclid(i64::from(self.modulus)) == i64::from(self.remainder)
    }
}

#[derive(Deserialize)]
struct DescriptorFields {
    resource_type: String,
    modulus: u32,
    remainder: u32,
}

impl TryFrom<DescriptorFields> for PartitionDescriptor {
    type Error = Error;

    fn try_from(fields: DescriptorFields) -> Result<Self> {
        Self::new(fields.resource_type, fields.modulus, fields.remainder)
    }
}

impl std::fmt::Display for PartitionDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}[{} mod {}]",
            self.resource_type, self.remainder, self.modulus
        )
    }
}

/// Partition parameters for one extraction run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum number of concurrent store connections per batch
    pub pool_size: u32,
    /// Number of sequential batches the run is divided into
    pub batch_count: u32,
}

impl PlannerConfig {
    /// Create a validated planner config
    pub fn new(pool_size: u32, batch_count: u32) -> Result<Self> {
        let config = Self {
            pool_size,
            batch_count,
        };
        config.validate()?;
        Ok(config)
    }

    /// Derive the batch count from an estimated row count
    ///
    /// Uses `ceil(row_count / rows_per_batch)` batches, at least one.
    pub fn from_row_count(row_count: u64, pool_size: u32, rows_per_batch: u64) -> Result<Self> {
        if rows_per_batch == 0 {
            return Err(Error::config("rows_per_batch must be at least 1"));
        }
        let batches = row_count.div_ceil(rows_per_batch).max(1);
        let batch_count = u32::try_from(batches)
            .map_err(|_| Error::config(format!("batch count {batches} exceeds u32")))?;
        Self::new(pool_size, batch_count)
    }

    /// Check that the parameters describe a usable partitioning
    pub fn validate(&self) -> Result<()> {
        if self.pool_size < 1 {
            return Err(Error::config("pool_size must be at least 1"));
        }
        if self.batch_count < 1 {
            return Err(Error::config("batch_count must be at least 1"));
        }
        self.modulus()?;
        Ok(())
    }

    /// Total number of partitions across all batches
    pub fn modulus(&self) -> Result<u32> {
        self.batch_count.checked_mul(self.pool_size).ok_or_else(|| {
            Error::config(format!(
                "batch_count {} * pool_size {} overflows",
                self.batch_count, self.pool_size
            ))
        })
    }
}
