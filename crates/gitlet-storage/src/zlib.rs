//! Zlib helpers for object and pack coding.
//!
//! Stored objects occupy a whole file, so the bulk paths suffice for them.
//! Pack files concatenate independent zlib streams with no external length
//! field, so [`decompress_stream`] additionally reports how many compressed
//! bytes the decoder consumed.

use crate::{Result, StorageError};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::{Read, Write};

/// Compresses a buffer at the default level.
pub fn compress(input: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(input)?;
    Ok(encoder.finish()?)
}

/// Decompresses a buffer that holds exactly one zlib stream.
pub fn decompress(input: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(input);
    let mut out = Vec::with_capacity(input.len().saturating_mul(8));
    decoder
        .read_to_end(&mut out)
        .map_err(|e| StorageError::Corrupt(e.to_string()))?;
    Ok(out)
}

/// Decompresses one zlib stream from the front of `input`.
///
/// Runs the decoder to its end-of-stream marker and returns the decoded
/// bytes together with the exact number of compressed bytes consumed,
/// so a caller can advance past the stream to whatever follows it.
///
/// `expected_out` is the decoded size the caller got from a header; a
/// stream that decodes to a different length is corrupt.
pub fn decompress_stream(input: &[u8], expected_out: usize) -> Result<(Vec<u8>, usize)> {
    let mut decoder = ZlibDecoder::new(input);
    let mut out = vec![0u8; expected_out];
    decoder
        .read_exact(&mut out)
        .map_err(|e| StorageError::Corrupt(e.to_string()))?;

    // Drive the decoder over the stream-end marker and checksum so that
    // total_in() covers the whole stream, not just the data blocks.
    let mut overrun = [0u8; 1];
    match decoder.read(&mut overrun) {
        Ok(0) => {}
        Ok(_) => {
            return Err(StorageError::Corrupt(format!(
                "zlib stream longer than declared size {}",
                expected_out
            )))
        }
        Err(e) => return Err(StorageError::Corrupt(e.to_string())),
    }

    Ok((out, decoder.total_in() as usize))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_roundtrip() {
        let data = b"The quick brown fox jumps over the lazy dog";
        let compressed = compress(data).unwrap();
        let decompressed = decompress(&compressed).unwrap();
        assert_eq!(decompressed, data);
    }

    #[test]
    fn test_decompress_garbage() {
        assert!(decompress(b"not zlib at all").is_err());
    }

    #[test]
    fn test_stream_reports_consumed() {
        let data = b"first stream payload";
        let mut buf = compress(data).unwrap();
        let stream_len = buf.len();
        buf.extend_from_slice(b"TRAILING BYTES");

        let (out, consumed) = decompress_stream(&buf, data.len()).unwrap();
        assert_eq!(out, data);
        assert_eq!(consumed, stream_len);
    }

    #[test]
    fn test_stream_concatenated() {
        let a = b"alpha".to_vec();
        let b = b"bravo bravo".to_vec();
        let mut buf = compress(&a).unwrap();
        buf.extend_from_slice(&compress(&b).unwrap());

        let (out_a, consumed_a) = decompress_stream(&buf, a.len()).unwrap();
        assert_eq!(out_a, a);
        let (out_b, consumed_b) = decompress_stream(&buf[consumed_a..], b.len()).unwrap();
        assert_eq!(out_b, b);
        assert_eq!(consumed_a + consumed_b, buf.len());
    }

    #[test]
    fn test_stream_truncated_input() {
        let compressed = compress(b"some payload that should not fit").unwrap();
        let result = decompress_stream(&compressed[..compressed.len() / 2], 32);
        assert!(result.is_err());
    }

    #[test]
    fn test_stream_undersized_expectation() {
        // Declared size smaller than the real decoded size is corrupt.
        let compressed = compress(b"twelve bytes").unwrap();
        assert!(decompress_stream(&compressed, 4).is_err());
    }

    #[test]
    fn test_empty_payload() {
        let compressed = compress(b"").unwrap();
        let (out, consumed) = decompress_stream(&compressed, 0).unwrap();
        assert!(out.is_empty());
        assert_eq!(consumed, compressed.len());
    }
}
