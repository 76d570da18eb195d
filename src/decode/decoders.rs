//! Decoder implementations
//!
//! Maps one stored row to one extracted record.

use super::types::ResourceEncoding;
use crate::error::{Error, Result};
use crate::types::{ExtractedRecord, StoredRow};
use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::io::{self, Read, Write};

/// Decode a stored row into an extracted record
///
/// - `JSON`: content bytes as UTF-8, unchanged
/// - `JSONC`: gzip-decompressed content as UTF-8
/// - `DEL`: empty payload, stored content ignored
///
/// Any other tag fails with [`Error::UnknownEncoding`]. Missing, empty or
/// undecodable content on a live version fails with [`Error::DecodeFailure`].
pub fn decode_row(row: StoredRow) -> Result<ExtractedRecord> {
    let StoredRow {
        resource_id,
        resource_type,
        last_updated,
        resource_version,
        encoding,
        content,
    } = row;

    let Some(encoding) = ResourceEncoding::from_tag(&encoding) else {
        return Err(Error::unknown_encoding(resource_id, encoding));
    };

    let payload = match encoding {
        ResourceEncoding::Deleted => String::new(),
        ResourceEncoding::Json => {
            let bytes = live_content(&resource_id, content)?;
            String::from_utf8(bytes)
                .map_err(|e| Error::decode(&resource_id, format!("invalid UTF-8 payload: {e}")))?
        }
        ResourceEncoding::JsonCompressed => {
            let bytes = live_content(&resource_id, content)?;
            decompress_payload(&bytes).map_err(|e| Error::decode(&resource_id, e.to_string()))?
        }
    };

    // A live version that decodes to nothing would be indistinguishable
    // from a tombstone downstream.
    if encoding != ResourceEncoding::Deleted && payload.is_empty() {
        return Err(Error::decode(&resource_id, "empty payload on live version"));
    }

    Ok(ExtractedRecord {
        resource_id,
        resource_type,
        resource_version,
        last_updated,
        payload,
    })
}

fn live_content(resource_id: &str, content: Option<Vec<u8>>) -> Result<Vec<u8>> {
    content.ok_or_else(|| Error::decode(resource_id, "missing content on live version"))
}

/// Gunzip a payload and interpret it as UTF-8
///
/// Every gzip member is decoded and concatenated. A truncated or corrupt
/// member, or bytes left over after the last member, is an error rather
/// than a short result.
pub fn decompress_payload(bytes: &[u8]) -> io::Result<String> {
    let mut decoder = MultiGzDecoder::new(bytes);
    let mut text = String::new();
    decoder.read_to_string(&mut text)?;

    let rest = decoder.into_inner();
    if !rest.is_empty() {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("{} trailing bytes after gzip stream", rest.len()),
        ));
    }
    Ok(text)
}

/// Gzip a payload the way `JSONC` versions are stored
pub fn compress_payload(text: &str) -> io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes())?;
    encoder.finish()
}
