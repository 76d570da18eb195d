//! Common types used throughout hapi-extract
//!
//! Record and row shapes shared by the fetcher, the decoder and the engine.

use serde::{Deserialize, Serialize};

// ============================================================================
// Stored Row
// ============================================================================

/// A raw row as returned by the store, before its payload is decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRow {
    /// Store-assigned resource id (`res_id`)
    pub resource_id: String,
    /// Resource type (`res_type`)
    pub resource_type: String,
    /// Last update timestamp as rendered by the store (`res_updated`)
    pub last_updated: String,
    /// Current version number (`res_ver`)
    pub resource_version: i64,
    /// Encoding tag as stored (`res_encoding`)
    pub encoding: String,
    /// Raw payload bytes (`res_text`)
    pub content: Option<Vec<u8>>,
}

// ============================================================================
// Extracted Record
// ============================================================================

/// One decoded resource version
///
/// Only the decode step builds these. `payload` is empty exactly when the
/// stored version is a tombstone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub resource_id: String,
    pub resource_type: String,
    pub resource_version: i64,
    pub last_updated: String,
    pub payload: String,
}

impl ExtractedRecord {
    /// Whether this record is a tombstone
    pub fn is_deleted(&self) -> bool {
        self.payload.is_empty()
    }
}
