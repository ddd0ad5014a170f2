//! This module defines the core, strongly-typed data representations used
//! throughout the routing core.
//!
//! It includes the `StreamType` enum, which describes what a stream holds, and
//! the `TaggedStream` container that carries a payload plus its routing tag
//! between the dispatcher, the clustering engine and the successors.

pub mod stream_type;
pub mod tagged_stream;

// Re-export the main type(s) for easier access.
pub use stream_type::{StreamType, TypeWidth, NUMERIC_WIDTHS};
pub use tagged_stream::{
    StreamPayload, TaggedStream, CLUSTERING_TAG_METADATA_ID, DISPATCH_CHANNEL_ID,
};
