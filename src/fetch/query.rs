//! Range query construction
//!
//! SQL for the HAPI schema. Values are always bound as parameters.

use crate::error::Result;
use crate::partition::PartitionDescriptor;

/// Query selecting one partition of one resource type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeQuery {
    /// Resource type to select (`res_type = ?`)
    pub resource_type: String,
    /// Partition modulus (`res_id % ?`)
    pub modulus: i64,
    /// Partition remainder (`= ?`)
    pub remainder: i64,
}

impl RangeQuery {
    /// Build the query for a partition
    ///
    /// Fails with `InvalidConfiguration` unless `0 <= remainder < modulus`.
    pub fn for_partition(descriptor: &PartitionDescriptor) -> Result<Self> {
        descriptor.validate()?;
        Ok(Self {
            resource_type: descriptor.resource_type.clone(),
            modulus: i64::from(descriptor.modulus),
            remainder: i64::from(descriptor.remainder),
        })
    }

    /// Whether a numeric resource id belongs to this range
    pub fn matches(&self, resource_id: i64) -> bool {
        resource_id.rem_euclid(self.modulus) == self.remainder
    }

    /// Render the SQL text, tables optionally qualified by `table_prefix`
    ///
    /// Parameters, in order: resource type, modulus, remainder. The join picks
    /// the version row matching the resource's current version.
    pub fn sql(&self, table_prefix: Option<&str>) -> String {
        format!(
            "SELECT CAST(res.res_id AS VARCHAR), res.res_type, CAST(res.res_updated AS VARCHAR), \
             CAST(res.res_ver AS BIGINT), ver.res_encoding, ver.res_text \
             FROM {} res \
             JOIN {} ver ON res.res_id = ver.res_id AND res.res_ver = ver.res_ver \
             WHERE res.res_type = ? AND res.res_id % CAST(? AS BIGINT) = CAST(? AS BIGINT)",
            qualify(table_prefix, "hfj_resource"),
            qualify(table_prefix, "hfj_res_ver"),
        )
    }

    /// Render the row count query for one resource type (one parameter)
    pub fn count_sql(table_prefix: Option<&str>) -> String {
        format!(
            "SELECT COUNT(*) FROM {} WHERE res_type = ?",
            qualify(table_prefix, "hfj_resource")
        )
    }
}

fn qualify(prefix: Option<&str>, table: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{prefix}.{table}"),
        _ => table.to_string(),
    }
}
