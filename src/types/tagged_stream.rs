//! The per-invocation stream representation that flows between dispatch,
//! clustering and the successors.
//!
//! A `TaggedStream` owns its payload and carries a small map of integer
//! metadata. Routing tags travel through that map (out of band), so a producer
//! can label a stream without going through the dispatch tag array.

use std::collections::BTreeMap;

use crate::error::tambakError;
use crate::types::{StreamType, TypeWidth};

/// Metadata id under which a stream's routing tag is stored.
pub const CLUSTERING_TAG_METADATA_ID: u32 = 0;
/// Metadata id under which the dispatcher records a channel's index.
pub const DISPATCH_CHANNEL_ID: u32 = 1;

/// The owned content of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    /// A contiguous buffer of fixed-width elements (Serial, Struct, Numeric).
    Fixed(Vec<u8>),
    /// Length-delimited elements: `lens[i]` bytes of `content` per element, in order.
    Strings { content: Vec<u8>, lens: Vec<u32> },
}

/// A typed stream with out-of-band integer metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedStream {
    stream_type: StreamType,
    width: usize,
    payload: StreamPayload,
    metadata: BTreeMap<u32, i32>,
}

impl TaggedStream {
    /// Creates a serial (byte) stream.
    pub fn serial(bytes: Vec<u8>) -> Self {
        Self {
            stream_type: StreamType::Serial,
            width: 1,
            payload: StreamPayload::Fixed(bytes),
            metadata: BTreeMap::new(),
        }
    }

    /// Creates a numeric stream of `width`-byte little-endian values.
    pub fn numeric(width: usize, bytes: Vec<u8>) -> Result<Self, tambakError> {
        Self::fixed(StreamType::Numeric, width, bytes)
    }

    /// Creates a numeric stream from a typed slice; the width is the size of `T`.
    pub fn numeric_from_slice<T: bytemuck::Pod>(values: &[T]) -> Result<Self, tambakError> {
        Self::numeric(std::mem::size_of::<T>(), bytemuck::cast_slice(values).to_vec())
    }

    /// Creates a stream of fixed-width records.
    pub fn structs(width: usize, bytes: Vec<u8>) -> Result<Self, tambakError> {
        Self::fixed(StreamType::Struct, width, bytes)
    }

    /// Creates a string stream. `lens` must account for every byte of `content`.
    pub fn strings(content: Vec<u8>, lens: Vec<u32>) -> Result<Self, tambakError> {
        let declared = lens
            .iter()
            .try_fold(0usize, |acc, &l| acc.checked_add(l as usize))
            .ok_or_else(|| tambakError::Corruption("String lengths overflow".to_string()))?;
        if declared != content.len() {
            return Err(tambakError::Corruption(format!(
                "String lengths sum to {} but content holds {} bytes",
                declared,
                content.len()
            )));
        }
        Ok(Self {
            stream_type: StreamType::String,
            width: 0,
            payload: StreamPayload::Strings { content, lens },
            metadata: BTreeMap::new(),
        })
    }

    /// Rebuilds a stream from a type, width and payload, checking that they agree.
    pub fn from_parts(
        stream_type: StreamType,
        width: usize,
        payload: StreamPayload,
    ) -> Result<Self, tambakError> {
        match (stream_type, payload) {
            (StreamType::String, StreamPayload::Strings { content, lens }) => {
                Self::strings(content, lens)
            }
            (StreamType::String, StreamPayload::Fixed(_)) => Err(tambakError::InvalidInput(
                "String streams require a length-delimited payload".to_string(),
            )),
            (_, StreamPayload::Strings { .. }) => Err(tambakError::InvalidInput(format!(
                "{} streams require a contiguous payload",
                stream_type
            ))),
            (StreamType::Serial, StreamPayload::Fixed(bytes)) => {
                StreamType::Serial
                    .check_width(width)
                    .map_err(tambakError::InvalidInput)?;
                Ok(Self::serial(bytes))
            }
            (t, StreamPayload::Fixed(bytes)) => Self::fixed(t, width, bytes),
        }
    }

    fn fixed(stream_type: StreamType, width: usize, bytes: Vec<u8>) -> Result<Self, tambakError> {
        stream_type
            .check_width(width)
            .map_err(tambakError::InvalidInput)?;
        if bytes.len() % width != 0 {
            return Err(tambakError::BufferMismatch(width, bytes.len()));
        }
        Ok(Self {
            stream_type,
            width,
            payload: StreamPayload::Fixed(bytes),
            metadata: BTreeMap::new(),
        })
    }

    //------------------------------------------------------------------------------
    // Metadata
    //------------------------------------------------------------------------------

    /// Attaches a routing tag, consuming and returning the stream.
    pub fn with_tag(mut self, tag: i32) -> Self {
        self.set_tag(tag);
        self
    }

    pub fn set_tag(&mut self, tag: i32) {
        self.set_int_metadata(CLUSTERING_TAG_METADATA_ID, tag);
    }

    /// The routing tag, if a producer attached one.
    pub fn tag(&self) -> Option<i32> {
        self.int_metadata(CLUSTERING_TAG_METADATA_ID)
    }

    pub fn set_int_metadata(&mut self, id: u32, value: i32) {
        self.metadata.insert(id, value);
    }

    pub fn int_metadata(&self, id: u32) -> Option<i32> {
        self.metadata.get(&id).copied()
    }

    //------------------------------------------------------------------------------
    // Shape accessors
    //------------------------------------------------------------------------------

    pub fn stream_type(&self) -> StreamType {
        self.stream_type
    }

    /// Element width in bytes (1 for Serial, 0 for String).
    pub fn width(&self) -> usize {
        self.width
    }

    pub fn type_width(&self) -> TypeWidth {
        TypeWidth {
            stream_type: self.stream_type,
            width: self.width,
        }
    }

    pub fn payload(&self) -> &StreamPayload {
        &self.payload
    }

    pub fn into_payload(self) -> StreamPayload {
        self.payload
    }

    /// The content bytes. For strings this is the concatenation of all elements.
    pub fn content(&self) -> &[u8] {
        match &self.payload {
            StreamPayload::Fixed(bytes) => bytes,
            StreamPayload::Strings { content, .. } => content,
        }
    }

    /// Per-element lengths for string streams.
    pub fn string_lens(&self) -> Option<&[u32]> {
        match &self.payload {
            StreamPayload::Strings { lens, .. } => Some(lens),
            StreamPayload::Fixed(_) => None,
        }
    }

    /// Number of elements in the stream.
    pub fn num_elts(&self) -> usize {
        match &self.payload {
            StreamPayload::Fixed(bytes) => bytes.len() / self.width.max(1),
            StreamPayload::Strings { lens, .. } => lens.len(),
        }
    }

    /// Size of the content in bytes, excluding string lengths.
    pub fn content_size(&self) -> usize {
        self.content().len()
    }

    pub fn is_empty(&self) -> bool {
        self.num_elts() == 0
    }

    /// Iterates over the elements of a string stream. Empty for other types.
    pub fn elements(&self) -> impl Iterator<Item = &[u8]> + '_ {
        let (content, lens): (&[u8], &[u32]) = match &self.payload {
            StreamPayload::Strings { content, lens } => (content, lens),
            StreamPayload::Fixed(_) => (&[], &[]),
        };
        lens.iter().scan(0usize, move |offset, &len| {
            let start = *offset;
            *offset += len as usize;
            Some(&content[start..*offset])
        })
    }
}
