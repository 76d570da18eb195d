//! Row decoder module
//!
//! Supports: JSON, JSONC (gzip), DEL (tombstone)
//!
//! # Overview
//!
//! Every stored resource version carries an encoding tag next to its payload.
//! The decoder turns a raw [`StoredRow`](crate::types::StoredRow) into an
//! [`ExtractedRecord`](crate::types::ExtractedRecord), refusing to emit a
//! record whose payload could not be fully recovered.

mod decoders;
mod types;

pub use decoders::{compress_payload, decode_row, decompress_payload};
pub use types::ResourceEncoding;
