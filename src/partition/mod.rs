//! Partition planning module
//!
//! # Overview
//!
//! A run over one resource type is split into `batch_count` sequential
//! batches, and each batch into `pool_size` partitions that can be fetched
//! concurrently. Every partition selects the ids in one residue class
//! `res_id % modulus == remainder`, with `modulus = batch_count * pool_size`.
//! Planning every batch of a run covers each residue exactly once.

mod planner;
mod types;

pub use planner::{plan, PartitionPlanner};
pub use types::{PartitionDescriptor, PlannerConfig};
