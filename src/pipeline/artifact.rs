//! Defines the self-describing on-disk format for a single graph frame.
//! This module is the single source of truth for serialization, deserialization,
//! and efficient metadata peeking of the frame.
//!
//! ```text
//! magic(4) | version(u16) | original_size(u64) | header_len(u32)
//! header:  source_kind(u16-prefixed) | plan_json(u32-prefixed)
//!          stream_count(u16) | { id(u16-prefixed) | len(u64) }*
//! payloads, in header order
//! ```

use crate::error::tambakError;
use crate::pipeline::format::{FRAME_FORMAT_VERSION, FRAME_MAGIC};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};

//==================================================================================
// Format Constants
//==================================================================================
/// The minimum possible size of a valid frame in bytes.
const MIN_FRAME_SIZE: usize = 18; // magic(4) + ver(2) + size(8) + header_len(4)
/// A reasonable limit to prevent OOM attacks from malformed string/plan lengths. (16MB)
const MAX_REASONABLE_STRING_LEN: usize = 16 * 1024 * 1024;

//==================================================================================
// Public Structs
//==================================================================================

/// The metadata extracted from a frame's header by [`GraphFrame::peek_info`],
/// without reading any payload.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct HeaderInfo {
    pub format_version: u16,
    /// Size of the original input: bytes for segment sources, elements otherwise.
    pub original_size: u64,
    /// `segments`, `elements` or `streams`.
    pub source_kind: String,
    /// The routing plan as a UTF-8 JSON string.
    pub plan_json: String,
    /// Metadata for each stream: (stream_id, size_in_bytes), sorted by stream_id.
    pub stream_metadata: Vec<(String, usize)>,
    pub header_size: usize,
    pub data_size: usize,
}

/// A fully materialized frame.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphFrame {
    pub original_size: u64,
    pub source_kind: String,
    pub plan_json: String,
    pub streams: HashMap<String, Vec<u8>>,
}

//==================================================================================
// Core Implementation
//==================================================================================

impl GraphFrame {
    /// Serializes the frame into its canonical byte form. Stream keys are
    /// written in sorted order so equal frames always produce equal bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, tambakError> {
        let mut header_buf = Vec::new();

        write_prefixed_string(&mut header_buf, &self.source_kind, 2)?;
        write_prefixed_string(&mut header_buf, &self.plan_json, 4)?;

        let mut sorted: Vec<(&String, &Vec<u8>)> = self.streams.iter().collect();
        sorted.sort_by_key(|(k, _)| *k);

        let stream_count = u16::try_from(sorted.len()).map_err(|_| {
            tambakError::FrameFormatError(format!(
                "Too many streams for one frame: {}",
                sorted.len()
            ))
        })?;
        header_buf.extend_from_slice(&stream_count.to_le_bytes());

        for (key, data) in &sorted {
            write_prefixed_string(&mut header_buf, key, 2)?;
            header_buf.extend_from_slice(&(data.len() as u64).to_le_bytes());
        }

        let header_len = u32::try_from(header_buf.len()).map_err(|_| {
            tambakError::FrameFormatError("Frame header exceeds 4 GiB".to_string())
        })?;

        // --- Final Assembly ---
        let data_size: usize = sorted.iter().map(|(_, v)| v.len()).sum();
        let mut final_buf = Vec::with_capacity(MIN_FRAME_SIZE + header_buf.len() + data_size);
        final_buf.extend_from_slice(FRAME_MAGIC);
        final_buf.extend_from_slice(&FRAME_FORMAT_VERSION.to_le_bytes());
        final_buf.extend_from_slice(&self.original_size.to_le_bytes());
        final_buf.extend_from_slice(&header_len.to_le_bytes());
        final_buf.extend_from_slice(&header_buf);

        // Payloads IN THE SAME SORTED ORDER as the header.
        for (_, data) in &sorted {
            final_buf.extend_from_slice(data);
        }

        Ok(final_buf)
    }

    /// Deserializes a full frame, including all payloads.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, tambakError> {
        let info = Self::peek_info(bytes)?;

        let mut cursor = Cursor::new(bytes);
        cursor.set_position(info.header_size as u64);

        let map_err = |e: std::io::Error| tambakError::FrameFormatError(e.to_string());
        let mut streams = HashMap::with_capacity(info.stream_metadata.len());

        for (id, len) in info.stream_metadata {
            let mut data_buf = vec![0; len];
            cursor.read_exact(&mut data_buf).map_err(map_err)?;
            if streams.insert(id.clone(), data_buf).is_some() {
                return Err(tambakError::FrameFormatError(format!(
                    "Duplicate stream id '{}'",
                    id
                )));
            }
        }

        if cursor.position() as usize != bytes.len() {
            return Err(tambakError::FrameFormatError(format!(
                "{} trailing bytes after the last stream",
                bytes.len() - cursor.position() as usize
            )));
        }

        Ok(Self {
            original_size: info.original_size,
            source_kind: info.source_kind,
            plan_json: info.plan_json,
            streams,
        })
    }

    /// Parses only the header of a serialized frame.
    pub fn peek_info(bytes: &[u8]) -> Result<HeaderInfo, tambakError> {
        if bytes.len() < MIN_FRAME_SIZE {
            return Err(tambakError::FrameFormatError(format!(
                "Frame is too small to be valid. Minimum size: {}, got: {}",
                MIN_FRAME_SIZE,
                bytes.len()
            )));
        }

        let mut cursor = Cursor::new(bytes);
        let map_err = |e: std::io::Error| tambakError::FrameFormatError(e.to_string());

        let mut magic_buf = [0u8; 4];
        cursor.read_exact(&mut magic_buf).map_err(map_err)?;
        if magic_buf != *FRAME_MAGIC {
            return Err(tambakError::FrameFormatError(
                "Invalid frame magic number".into(),
            ));
        }

        let mut u16_buf = [0u8; 2];
        cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let version = u16::from_le_bytes(u16_buf);
        if version != FRAME_FORMAT_VERSION {
            return Err(tambakError::FrameFormatError(format!(
                "Unsupported frame version: expected {}, got {}",
                FRAME_FORMAT_VERSION, version
            )));
        }

        let mut u64_buf = [0u8; 8];
        cursor.read_exact(&mut u64_buf).map_err(map_err)?;
        let original_size = u64::from_le_bytes(u64_buf);

        let mut u32_buf = [0u8; 4];
        cursor.read_exact(&mut u32_buf).map_err(map_err)?;
        let header_metadata_len = u32::from_le_bytes(u32_buf) as usize;
        let total_header_size = cursor.position() as usize + header_metadata_len;

        // SECURITY: the declared header must fit in the buffer.
        if bytes.len() < total_header_size {
            return Err(tambakError::FrameFormatError(
                "Header length exceeds buffer size".into(),
            ));
        }

        let header_bytes = &bytes[cursor.position() as usize..total_header_size];
        let mut header_cursor = Cursor::new(header_bytes);

        let source_kind = read_prefixed_string(&mut header_cursor, 2)?;
        let plan_json = read_prefixed_string(&mut header_cursor, 4)?;

        header_cursor.read_exact(&mut u16_buf).map_err(map_err)?;
        let stream_count = u16::from_le_bytes(u16_buf);
        let mut stream_metadata = Vec::with_capacity(stream_count as usize);
        let mut total_data_size: usize = 0;

        for _ in 0..stream_count {
            let id = read_prefixed_string(&mut header_cursor, 2)?;
            header_cursor.read_exact(&mut u64_buf).map_err(map_err)?;
            let len = usize::try_from(u64::from_le_bytes(u64_buf)).map_err(|_| {
                tambakError::FrameFormatError(format!("Stream '{}' length overflows", id))
            })?;
            total_data_size = total_data_size.saturating_add(len);
            stream_metadata.push((id, len));
        }

        // SECURITY: the sum of parts must not exceed the buffer.
        if total_header_size.saturating_add(total_data_size) > bytes.len() {
            return Err(tambakError::FrameFormatError(
                "Sum of declared header and data sizes exceeds buffer length.".into(),
            ));
        }

        Ok(HeaderInfo {
            format_version: version,
            original_size,
            source_kind,
            plan_json,
            stream_metadata,
            header_size: total_header_size,
            data_size: total_data_size,
        })
    }

    /// Removes and returns a stream, or a frame error naming the missing id.
    pub fn take_stream(&mut self, id: &str) -> Result<Vec<u8>, tambakError> {
        self.streams.remove(id).ok_or_else(|| {
            tambakError::FrameFormatError(format!("Frame is missing stream '{}'", id))
        })
    }
}

//==================================================================================
// Private Helpers
//==================================================================================

fn read_prefixed_string(
    cursor: &mut Cursor<&[u8]>,
    len_bytes: usize,
) -> Result<String, tambakError> {
    let map_err = |e: std::io::Error| tambakError::FrameFormatError(e.to_string());

    let len = match len_bytes {
        2 => {
            let mut buf = [0u8; 2];
            cursor.read_exact(&mut buf).map_err(map_err)?;
            u16::from_le_bytes(buf) as usize
        }
        4 => {
            let mut buf = [0u8; 4];
            cursor.read_exact(&mut buf).map_err(map_err)?;
            u32::from_le_bytes(buf) as usize
        }
        _ => {
            return Err(tambakError::InternalError(
                "Unsupported length prefix size".into(),
            ))
        }
    };

    // SECURITY: Validate length against a sane maximum before allocating.
    if len > MAX_REASONABLE_STRING_LEN {
        return Err(tambakError::FrameFormatError(format!(
            "String length ({}) exceeds maximum allowed size ({})",
            len, MAX_REASONABLE_STRING_LEN
        )));
    }

    let mut str_buf = vec![0; len];
    cursor.read_exact(&mut str_buf).map_err(map_err)?;
    String::from_utf8(str_buf).map_err(|e| tambakError::FrameFormatError(e.to_string()))
}

fn write_prefixed_string<W: Write>(
    writer: &mut W,
    s: &str,
    len_bytes: usize,
) -> Result<(), tambakError> {
    let len = s.len();
    let limit = match len_bytes {
        2 => (u16::MAX as usize).min(MAX_REASONABLE_STRING_LEN),
        _ => MAX_REASONABLE_STRING_LEN,
    };
    if len > limit {
        return Err(tambakError::FrameFormatError(format!(
            "String length ({}) exceeds maximum allowed size ({})",
            len, limit
        )));
    }
    let map_err = |e: std::io::Error| tambakError::FrameFormatError(e.to_string());
    match len_bytes {
        2 => writer
            .write_all(&(len as u16).to_le_bytes())
            .map_err(map_err)?,
        4 => writer
            .write_all(&(len as u32).to_le_bytes())
            .map_err(map_err)?,
        _ => {
            return Err(tambakError::InternalError(
                "Unsupported length prefix size".into(),
            ))
        }
    }
    writer.write_all(s.as_bytes()).map_err(map_err)
}

//==================================================================================
// Unit Tests
//==================================================================================
