//! This module defines the two seams the routing core is built around.
//!
//! * [`Successor`] is the opaque next stage a routed stream is handed to. The
//!   core only ever addresses successors by their index in the registry.
//! * [`ConcatCodec`] is the strategy a configured cluster uses to merge its
//!   member streams into one, and to split them apart again on the way back.
//!
//! Both are `Send + Sync` so that a compiled graph holding them can be shared
//! across threads behind an `Arc`.

use crate::error::tambakError;
use crate::types::{StreamType, TaggedStream, TypeWidth};

/// A compressor stage that owns one routed stream's bytes.
pub trait Successor: Send + Sync {
    /// A short, stable name used in logs and in the serialized routing plan.
    fn name(&self) -> &str;

    fn encode(&self, stream: &TaggedStream) -> Result<Vec<u8>, tambakError>;

    /// Rebuilds a stream of the given shape from bytes produced by `encode`.
    fn decode(&self, bytes: &[u8], type_width: TypeWidth) -> Result<TaggedStream, tambakError>;
}

/// The result of merging a cluster's members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatOutput {
    pub merged: TaggedStream,
    /// Element count of each member, in member order. Needed to split.
    pub member_sizes: Vec<u64>,
}

/// A procedure for merging same-typed streams into one before compression.
pub trait ConcatCodec: Send + Sync {
    fn name(&self) -> &str;

    /// Returns `true` if this codec can merge streams of `stream_type`.
    fn accepts(&self, stream_type: StreamType) -> bool;

    fn concat(&self, members: &[&TaggedStream]) -> Result<ConcatOutput, tambakError>;

    /// Inverse of `concat`: cuts `merged` back into one stream per entry of
    /// `member_sizes`. Sizes that disagree with `merged` are corruption.
    fn split(
        &self,
        merged: &TaggedStream,
        member_sizes: &[u64],
    ) -> Result<Vec<TaggedStream>, tambakError>;
}
