//! This module contains the pure, stateless kernels for performing Zstandard
//! compression and decompression, and the `ZstdSuccessor` built on them.
//!
//! This is the reference entropy stage a routed stream can be forwarded to.
//! It is a safe, panic-free wrapper around the `zstd` crate.

use crate::error::tambakError;
use crate::kernels::store;
use crate::traits::Successor;
use crate::types::{TaggedStream, TypeWidth};

//==================================================================================
// 1. Public Kernel API
//==================================================================================

/// Compresses `input_bytes`, prefixing the output with the uncompressed size.
pub fn encode(input_bytes: &[u8], level: i32) -> Result<Vec<u8>, tambakError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let mut output_buf = Vec::with_capacity(input_bytes.len() / 2 + 16);

    let uncompressed_len: u64 = input_bytes.len() as u64;
    output_buf.extend_from_slice(&uncompressed_len.to_le_bytes());

    let mut encoder = zstd::stream::Encoder::new(&mut output_buf, level)
        .map_err(|e| tambakError::ZstdError(e.to_string()))?;
    std::io::Write::write_all(&mut encoder, input_bytes)
        .map_err(|e| tambakError::ZstdError(e.to_string()))?;
    // `finish` is essential to finalize the Zstd frame.
    encoder
        .finish()
        .map_err(|e| tambakError::ZstdError(e.to_string()))?;

    Ok(output_buf)
}

/// Decompresses a buffer produced by [`encode`], checking the recorded size.
pub fn decode(input_bytes: &[u8]) -> Result<Vec<u8>, tambakError> {
    if input_bytes.is_empty() {
        return Ok(Vec::new());
    }

    let (len_bytes, compressed_data) = input_bytes
        .split_first_chunk::<8>()
        .ok_or_else(|| {
            tambakError::ZstdError("Input stream too short to contain size header.".to_string())
        })?;
    let uncompressed_len = u64::from_le_bytes(*len_bytes) as usize;

    let mut decompressed_data = Vec::new();
    zstd::stream::copy_decode(compressed_data, &mut decompressed_data)
        .map_err(|e| tambakError::ZstdError(e.to_string()))?;

    if decompressed_data.len() != uncompressed_len {
        return Err(tambakError::ZstdError(format!(
            "Decompressed size does not match header. Expected {}, got {}.",
            uncompressed_len,
            decompressed_data.len()
        )));
    }

    Ok(decompressed_data)
}

//==================================================================================
// 2. Successor
//==================================================================================

/// Frames a stream with the store layout, then compresses the frame with Zstd.
#[derive(Debug, Clone)]
pub struct ZstdSuccessor {
    level: i32,
}

impl ZstdSuccessor {
    pub fn new(level: i32) -> Self {
        Self { level }
    }
}

impl Default for ZstdSuccessor {
    fn default() -> Self {
        Self::new(3)
    }
}

impl Successor for ZstdSuccessor {
    fn name(&self) -> &str {
        "zstd"
    }

    fn encode(&self, stream: &TaggedStream) -> Result<Vec<u8>, tambakError> {
        encode(&store::frame_stream(stream)?, self.level)
    }

    fn decode(&self, bytes: &[u8], type_width: TypeWidth) -> Result<TaggedStream, tambakError> {
        let framed = decode(bytes)?;
        store::unframe_stream(&framed, type_width)
    }
}

//==================================================================================
// 3. Unit Tests
//==================================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StreamType;

    #[test]
    fn test_zstd_roundtrip_simple_text() {
        let original_bytes =
            b"hello world, this is a test of zstd compression. hello world, this is a test."
                .to_vec();
        let compressed_bytes = encode(&original_bytes, 3).unwrap();
        assert!(compressed_bytes.len() < original_bytes.len());
        let decompressed_bytes = decode(&compressed_bytes).unwrap();
        assert_eq!(original_bytes, decompressed_bytes);
    }

    #[test]
    fn test_zstd_roundtrip_highly_compressible_data() {
        let original_bytes = vec![42u8; 10_000];
        let compressed_bytes = encode(&original_bytes, 5).unwrap();
        // The compressed size is slightly larger due to the 8-byte header.
        assert!(compressed_bytes.len() < 50);
        assert_eq!(original_bytes, decode(&compressed_bytes).unwrap());
    }

    #[test]
    fn test_zstd_decompress_invalid_data() {
        let result = decode(&[1, 2, 3, 4, 5]);
        assert!(result.unwrap_err().to_string().contains("Zstd"));
    }

    #[test]
    fn test_successor_preserves_string_streams() {
        let stream = TaggedStream::strings(b"alphabetagamma".to_vec(), vec![5, 4, 5]).unwrap();
        let successor = ZstdSuccessor::default();
        let bytes = successor.encode(&stream).unwrap();
        let back = successor
            .decode(&bytes, TypeWidth { stream_type: StreamType::String, width: 0 })
            .unwrap();
        assert_eq!(back, stream);
    }
}
