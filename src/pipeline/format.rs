// In: src/pipeline/format.rs

//! Defines the on-disk constants and the routing-plan contract for a graph
//! frame. The plan is what a decompressor needs to invert dispatch and
//! clustering; it is stored as JSON in the frame header.

use serde::{Deserialize, Serialize};

use crate::graph::EntryId;
use crate::types::StreamType;

//==================================================================================
// I. Frame Constants
//==================================================================================

/// The magic number identifying a graph frame.
pub const FRAME_MAGIC: &[u8; 4] = b"TBKG";
/// The current version of the graph frame format.
pub const FRAME_FORMAT_VERSION: u16 = 1;
/// The current version of the routing plan schema.
pub const PLAN_VERSION: u32 = 1;

/// Frame stream holding the LEB128 dispatch tags (segments or elements).
pub const DISPATCH_TAGS_STREAM: &str = "dispatch.tags";
/// Frame stream holding the LEB128 segment lengths.
pub const DISPATCH_SIZES_STREAM: &str = "dispatch.sizes";

/// Name of the frame stream holding group `index`'s successor output.
pub fn group_stream_name(index: usize) -> String {
    format!("group.{}", index)
}

/// Name of the frame stream holding group `index`'s LEB128 member sizes.
pub fn group_sizes_stream_name(index: usize) -> String {
    format!("group.{}.sizes", index)
}

//==================================================================================
// II. RoutingPlan Contract
//==================================================================================

/// What the routed streams were produced from.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourcePlan {
    /// A raw buffer cut by a segment partition. Channel `t` was routed with tag `t`.
    Segments {
        nb_tags: u32,
        nb_segments: u64,
        source_size: u64,
    },
    /// A string stream dispatched element by element.
    Elements { nb_tags: u32, nb_elements: u64 },
    /// Caller-supplied tagged streams.
    Streams { nb_streams: u64 },
}

impl SourcePlan {
    pub fn kind_name(&self) -> &'static str {
        match self {
            SourcePlan::Segments { .. } => "segments",
            SourcePlan::Elements { .. } => "elements",
            SourcePlan::Streams { .. } => "streams",
        }
    }
}

/// One routed input stream, as recorded in the plan.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct MemberPlan {
    pub stream_index: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<i32>,
    pub stream_type: StreamType,
    pub width: usize,
    pub num_elts: u64,
}

/// One group: the merged stream an entry produced and where it went.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GroupPlan {
    pub entry: EntryId,
    pub successor_idx: usize,
    /// Successor name at write time; checked against the reading graph.
    pub successor: String,
    pub concat_codec_idx: usize,
    pub stream_type: StreamType,
    pub width: usize,
    /// True when the single member was handed to the successor unmerged.
    pub forwarded: bool,
    pub members: Vec<MemberPlan>,
}

/// The full description of one compression invocation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RoutingPlan {
    pub plan_version: u32,
    pub source: SourcePlan,
    pub groups: Vec<GroupPlan>,
}
