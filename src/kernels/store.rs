//! The identity "store" layout for a stream's payload, and the `StoreSuccessor`
//! that writes it unchanged.
//!
//! Fixed-width payloads are stored as their raw bytes; the type and width are
//! recorded in the routing plan, not here. String payloads are laid out as:
//!
//! ```text
//! [count: u32 LE][lens_len: u32 LE][lens: LEB128 x count][content]
//! ```

use crate::error::tambakError;
use crate::kernels::leb128;
use crate::traits::Successor;
use crate::types::{StreamPayload, StreamType, TaggedStream, TypeWidth};

const STRING_FRAME_HEADER: usize = 8;

/// Serializes a stream's payload into the store layout.
pub fn frame_stream(stream: &TaggedStream) -> Result<Vec<u8>, tambakError> {
    match stream.payload() {
        StreamPayload::Fixed(bytes) => Ok(bytes.clone()),
        StreamPayload::Strings { content, lens } => {
            let count = u32::try_from(lens.len()).map_err(|_| {
                tambakError::InvalidInput(format!("Too many string elements: {}", lens.len()))
            })?;
            let lens_bytes = leb128::encode(lens)?;
            let lens_len = u32::try_from(lens_bytes.len()).map_err(|_| {
                tambakError::InvalidInput("String length table exceeds 4 GiB".to_string())
            })?;

            let mut out =
                Vec::with_capacity(STRING_FRAME_HEADER + lens_bytes.len() + content.len());
            out.extend_from_slice(&count.to_le_bytes());
            out.extend_from_slice(&lens_len.to_le_bytes());
            out.extend_from_slice(&lens_bytes);
            out.extend_from_slice(content);
            Ok(out)
        }
    }
}

/// Parses the store layout back into a stream of the given shape.
pub fn unframe_stream(bytes: &[u8], type_width: TypeWidth) -> Result<TaggedStream, tambakError> {
    if type_width.stream_type != StreamType::String {
        return TaggedStream::from_parts(
            type_width.stream_type,
            type_width.width,
            StreamPayload::Fixed(bytes.to_vec()),
        )
        .map_err(|e| tambakError::Corruption(format!("Stored {} stream: {}", type_width, e)));
    }

    if bytes.is_empty() {
        return TaggedStream::strings(Vec::new(), Vec::new());
    }
    if bytes.len() < STRING_FRAME_HEADER {
        return Err(tambakError::Corruption(
            "String frame too short to contain its header".to_string(),
        ));
    }
    let count = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let lens_len = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
    let body = &bytes[STRING_FRAME_HEADER..];
    if lens_len > body.len() {
        return Err(tambakError::Corruption(format!(
            "String length table claims {} bytes, only {} available",
            lens_len,
            body.len()
        )));
    }

    let (lens_bytes, content) = body.split_at(lens_len);
    let lens = leb128::decode::<u32>(lens_bytes, count)
        .map_err(|e| tambakError::Corruption(e.to_string()))?;
    TaggedStream::strings(content.to_vec(), lens)
}

/// A successor that stores the stream uncompressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoreSuccessor;

impl Successor for StoreSuccessor {
    fn name(&self) -> &str {
        "store"
    }

    fn encode(&self, stream: &TaggedStream) -> Result<Vec<u8>, tambakError> {
        frame_stream(stream)
    }

    fn decode(&self, bytes: &[u8], type_width: TypeWidth) -> Result<TaggedStream, tambakError> {
        unframe_stream(bytes, type_width)
    }
}
