//! Manifest codec.
//!
//! Payloads are deflated and then packed into a dense text form so they fit
//! in a single string attribute. `decode(encode(b)) == b` holds for every
//! byte sequence, including the empty one.

pub mod pack;

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

/// Failure to encode or decode a codec payload.
#[derive(Debug, Error, MietteDiagnostic)]
pub enum CodecError {
    #[error("unexpected character {found:?} at position {position} in encoded text")]
    #[diagnostic(code(splice::codec::invalid_symbol))]
    InvalidSymbol { position: usize, found: char },

    #[error("encoded text is truncated")]
    #[diagnostic(code(splice::codec::truncated))]
    Truncated,

    #[error("invalid padding in encoded text: {reason}")]
    #[diagnostic(code(splice::codec::bad_padding))]
    BadPadding { reason: String },

    #[error("compressed payload is corrupt: {0}")]
    #[diagnostic(
        code(splice::codec::decompression),
        help("The embedded manifest was damaged; rebuild the library that produced it")
    )]
    Decompression(String),

    #[error("failed to compress payload")]
    #[diagnostic(code(splice::codec::compression))]
    Compression(#[source] std::io::Error),
}

/// Compress and pack `bytes` into text.
pub fn encode(bytes: &[u8]) -> Result<String, CodecError> {
    let compressed = deflate(bytes)?;
    tracing::trace!(
        raw = bytes.len(),
        compressed = compressed.len(),
        "encoding codec payload"
    );
    Ok(pack::pack(&compressed))
}

/// Unpack and decompress text produced by [`encode`].
pub fn decode(text: &str) -> Result<Vec<u8>, CodecError> {
    let compressed = pack::unpack(text)?;
    inflate(&compressed)
}

fn deflate(bytes: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(bytes.len() / 2 + 16),
        Compression::best(),
    );
    encoder.write_all(bytes).map_err(CodecError::Compression)?;
    encoder.finish().map_err(CodecError::Compression)
}

fn inflate(compressed: &[u8]) -> Result<Vec<u8>, CodecError> {
    let mut decoder = Decompress::new(false);
    let mut out = Vec::with_capacity(compressed.len().saturating_mul(4).max(64));

    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }

        let before = (decoder.total_in(), decoder.total_out());
        let consumed = decoder.total_in() as usize;
        let status = decoder
            .decompress_vec(&compressed[consumed..], &mut out, FlushDecompress::None)
            .map_err(|e| CodecError::Decompression(e.to_string()))?;

        match status {
            Status::StreamEnd => {
                if (decoder.total_in() as usize) < compressed.len() {
                    return Err(CodecError::Decompression(format!(
                        "{} trailing bytes after end of stream",
                        compressed.len() - decoder.total_in() as usize
                    )));
                }
                return Ok(out);
            }
            Status::Ok | Status::BufError => {
                let stalled = (decoder.total_in(), decoder.total_out()) == before;
                if stalled && out.len() < out.capacity() {
                    return Err(CodecError::Decompression(
                        "stream ended before the final block".to_string(),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic xorshift bytes.
    fn random_bytes(len: usize, mut seed: u64) -> Vec<u8> {
        (0..len)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 7;
                seed ^= seed << 17;
                (seed >> 24) as u8
            })
            .collect()
    }

    #[test]
    fn test_roundtrip_empty() {
        let text = encode(&[]).unwrap();
        assert_eq!(decode(&text).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn test_roundtrip_text() {
        let body = "namespace Lib { public static class Put { } }\n".repeat(50);
        let text = encode(body.as_bytes()).unwrap();

        assert!(text.chars().count() < body.len() / 4);
        assert_eq!(decode(&text).unwrap(), body.as_bytes());
    }

    #[test]
    fn test_roundtrip_random_sizes() {
        for (i, len) in [1usize, 2, 7, 8, 15, 16, 255, 4096].into_iter().enumerate() {
            let bytes = random_bytes(len, 0x9E37_79B9_7F4A_7C15 ^ i as u64);
            assert_eq!(decode(&encode(&bytes).unwrap()).unwrap(), bytes);
        }
    }

    #[test]
    fn test_random_buffer_length_bound() {
        let bytes = random_bytes(10_000, 42);
        let compressed = deflate(&bytes).unwrap();
        let text = encode(&bytes).unwrap();

        assert_eq!(
            text.chars().count(),
            (compressed.len() * 8).div_ceil(15) + 1
        );
        // Incompressible input costs at most a few bytes of framing.
        assert!(compressed.len() <= bytes.len() + 64);
        assert_eq!(decode(&text).unwrap(), bytes);
    }

    #[test]
    fn test_truncated_stream_is_decompression_error() {
        let body = "using System;\n".repeat(200);
        let compressed = deflate(body.as_bytes()).unwrap();
        let cut = pack::pack(&compressed[..compressed.len() / 2]);

        assert!(matches!(decode(&cut), Err(CodecError::Decompression(_))));
    }

    #[test]
    fn test_garbage_stream_is_decompression_error() {
        let text = pack::pack(&[0xFF; 32]);
        assert!(matches!(decode(&text), Err(CodecError::Decompression(_))));
    }

    #[test]
    fn test_malformed_text_is_codec_error() {
        let mut text = encode(b"hello").unwrap();
        text.insert(0, '!');
        assert!(matches!(
            decode(&text),
            Err(CodecError::InvalidSymbol { position: 0, .. })
        ));
    }
}
