//! Decoder types
//!
//! Stored payload encodings.

use serde::{Deserialize, Serialize};

/// Payload encoding of a stored resource version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceEncoding {
    /// Plain JSON text
    #[serde(rename = "JSON")]
    Json,
    /// Gzip-compressed JSON text
    #[serde(rename = "JSONC")]
    JsonCompressed,
    /// Deleted version (tombstone)
    #[serde(rename = "DEL")]
    Deleted,
}

impl ResourceEncoding {
    /// Parse a stored encoding tag. Tags are matched exactly.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "JSON" => Some(Self::Json),
            "JSONC" => Some(Self::JsonCompressed),
            "DEL" => Some(Self::Deleted),
            _ => None,
        }
    }

    /// The tag used in the store for this encoding
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Json => "JSON",
            Self::JsonCompressed => "JSONC",
            Self::Deleted => "DEL",
        }
    }
}

impl std::fmt::Display for ResourceEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_tag())
    }
}

