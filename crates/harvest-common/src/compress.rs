//! Decompression helpers for downloaded content
//!
//! Submitted content may arrive gzip-compressed; consumers decompress it
//! before text extraction.

use crate::error::{HarvestError, Result};
use flate2::read::GzDecoder;
use std::io::Read;
use tracing::debug;

/// Gzip magic bytes, used to sniff compressed payloads regardless of what
/// the declared content type claims.
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Check whether a payload looks gzip-compressed.
pub fn is_gzip(data: &[u8]) -> bool {
    data.len() >= 2 && data[..2] == GZIP_MAGIC
}

/// Decompress gzip-compressed data.
pub fn decompress_gzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut decompressed = Vec::new();
    decoder
        .read_to_end(&mut decompressed)
        .map_err(|e| HarvestError::Decompression(e.to_string()))?;
    debug!("Decompressed {} -> {} bytes", data.len(), decompressed.len());
    Ok(decompressed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_is_gzip() {
        assert!(is_gzip(&gzip(b"payload")));
        assert!(!is_gzip(b"plain text"));
        assert!(!is_gzip(b""));
    }

    #[test]
    fn test_decompress_gzip_round_trip() {
        let compressed = gzip(b"Hello, Harvest!");
        let decompressed = decompress_gzip(&compressed).unwrap();
        assert_eq!(decompressed, b"Hello, Harvest!");
    }

    #[test]
    fn test_decompress_gzip_rejects_garbage() {
        assert!(decompress_gzip(b"not gzip at all").is_err());
    }
}
