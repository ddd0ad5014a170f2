// In: src/pipeline/orchestrator.rs

//! The top-level coordinators for one compression or decompression call.
//!
//! Compression runs dispatch (when the source is a raw buffer or a string
//! stream), then clustering, then hands every group to its successor, and
//! finally records what happened in a `RoutingPlan` stored in the frame
//! header. Decompression reads the plan back and inverts each step.
//!
//! Everything here runs on the calling thread and touches only the graph
//! read-only; all buffers belong to the call.

use std::collections::HashMap;

use crate::clustering::RoutedGroup;
use crate::dispatch::{restore_bytes, restore_elements, SegmentPartition};
use crate::error::tambakError;
use crate::graph::CompiledGraph;
use crate::kernels::leb128;
use crate::pipeline::artifact::GraphFrame;
use crate::pipeline::format::{
    group_sizes_stream_name, group_stream_name, GroupPlan, MemberPlan, RoutingPlan, SourcePlan,
    DISPATCH_SIZES_STREAM, DISPATCH_TAGS_STREAM, PLAN_VERSION,
};
use crate::types::{TaggedStream, TypeWidth};

/// What a frame decompresses to, mirroring what was compressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decompressed {
    /// The raw buffer given to `compress_segments`.
    Bytes(Vec<u8>),
    /// The string stream given to `compress_elements`.
    Elements(TaggedStream),
    /// The streams given to `compress_streams`, in order, with their tags.
    Streams(Vec<TaggedStream>),
}

//==================================================================================
// 1. Compression
//==================================================================================

pub fn compress_segments(
    graph: &CompiledGraph,
    source: &[u8],
    partition: &SegmentPartition,
) -> Result<Vec<u8>, tambakError> {
    let dispatcher = graph.require_dispatcher()?;
    let channels = dispatcher.dispatch(source, partition)?;

    let mut frame_streams = HashMap::new();
    frame_streams.insert(
        DISPATCH_TAGS_STREAM.to_string(),
        leb128::encode(partition.tags())?,
    );
    frame_streams.insert(
        DISPATCH_SIZES_STREAM.to_string(),
        leb128::encode(partition.lengths())?,
    );

    let groups = route_channels(graph, channels, &mut frame_streams)?;
    let plan = RoutingPlan {
        plan_version: PLAN_VERSION,
        source: SourcePlan::Segments {
            nb_tags: dispatcher.nb_tags(),
            nb_segments: partition.len() as u64,
            source_size: source.len() as u64,
        },
        groups,
    };
    write_frame(source.len() as u64, &plan, frame_streams)
}

pub fn compress_elements(
    graph: &CompiledGraph,
    source: &TaggedStream,
    tags: &[u32],
) -> Result<Vec<u8>, tambakError> {
    let dispatcher = graph.require_dispatcher()?;
    let channels = dispatcher.dispatch_elements(source, tags)?;

    let mut frame_streams = HashMap::new();
    frame_streams.insert(DISPATCH_TAGS_STREAM.to_string(), leb128::encode(tags)?);

    let groups = route_channels(graph, channels, &mut frame_streams)?;
    let plan = RoutingPlan {
        plan_version: PLAN_VERSION,
        source: SourcePlan::Elements {
            nb_tags: dispatcher.nb_tags(),
            nb_elements: tags.len() as u64,
        },
        groups,
    };
    write_frame(tags.len() as u64, &plan, frame_streams)
}

pub fn compress_streams(
    graph: &CompiledGraph,
    streams: Vec<TaggedStream>,
) -> Result<Vec<u8>, tambakError> {
    let nb_streams = streams.len() as u64;
    let mut frame_streams = HashMap::new();
    let stream_indices: Vec<usize> = (0..streams.len()).collect();
    let groups = encode_groups(graph, streams, &stream_indices, &mut frame_streams)?;
    let plan = RoutingPlan {
        plan_version: PLAN_VERSION,
        source: SourcePlan::Streams { nb_streams },
        groups,
    };
    write_frame(nb_streams, &plan, frame_streams)
}

/// Tags each non-empty dispatch channel with its index and routes it.
/// Empty channels are not routed; decompression recreates them.
fn route_channels(
    graph: &CompiledGraph,
    channels: Vec<TaggedStream>,
    frame_streams: &mut HashMap<String, Vec<u8>>,
) -> Result<Vec<GroupPlan>, tambakError> {
    let mut stream_indices = Vec::new();
    let mut streams = Vec::new();
    for (channel, mut stream) in channels.into_iter().enumerate() {
        if stream.is_empty() {
            continue;
        }
        stream.set_tag(channel as i32);
        stream_indices.push(channel);
        streams.push(stream);
    }
    encode_groups(graph, streams, &stream_indices, frame_streams)
}

/// Routes `streams`, encodes every group with its successor, and describes the
/// groups for the plan. `stream_indices[i]` is the index recorded for `streams[i]`.
fn encode_groups(
    graph: &CompiledGraph,
    streams: Vec<TaggedStream>,
    stream_indices: &[usize],
    frame_streams: &mut HashMap<String, Vec<u8>>,
) -> Result<Vec<GroupPlan>, tambakError> {
    let engine = graph.engine();
    let groups = engine.route(streams)?;

    let mut plans = Vec::with_capacity(groups.len());
    for (group_idx, group) in groups.iter().enumerate() {
        let encoded = engine
            .forward(group)
            .map_err(|e| e.at_stage(&format!("successor {}", group.successor_idx)))?;

        if graph.config().enable_stats_collection {
            log::info!(
                "{}: {} member(s), {} -> {} bytes via successor {}",
                group.entry,
                group.members.len(),
                group.stream.content_size(),
                encoded.len(),
                group.successor_idx
            );
        }

        frame_streams.insert(group_stream_name(group_idx), encoded);
        if let Some(sizes) = &group.member_sizes {
            frame_streams.insert(group_sizes_stream_name(group_idx), leb128::encode(sizes)?);
        }
        plans.push(group_plan(graph, group, stream_indices)?);
    }

    log::debug!(
        "Routed {} stream(s) into {} group(s)",
        stream_indices.len(),
        plans.len()
    );
    Ok(plans)
}

fn group_plan(
    graph: &CompiledGraph,
    group: &RoutedGroup,
    stream_indices: &[usize],
) -> Result<GroupPlan, tambakError> {
    let successor = graph
        .registry()
        .successor(group.successor_idx)
        .map(|s| s.name().to_string())
        .unwrap_or_default();

    let members = group
        .members
        .iter()
        .map(|m| {
            let stream_index = stream_indices.get(m.stream_index).copied().ok_or_else(|| {
                tambakError::InternalError(format!("No index for routed stream {}", m.stream_index))
            })?;
            Ok(MemberPlan {
                stream_index: stream_index as u64,
                tag: m.tag,
                stream_type: m.type_width.stream_type,
                width: m.type_width.width,
                num_elts: m.num_elts,
            })
        })
        .collect::<Result<Vec<_>, tambakError>>()?;

    Ok(GroupPlan {
        entry: group.entry,
        successor_idx: group.successor_idx,
        successor,
        concat_codec_idx: group.concat_codec_idx,
        stream_type: group.stream.stream_type(),
        width: group.stream.width(),
        forwarded: group.is_forwarded(),
        members,
    })
}

fn write_frame(
    original_size: u64,
    plan: &RoutingPlan,
    streams: HashMap<String, Vec<u8>>,
) -> Result<Vec<u8>, tambakError> {
    let frame = GraphFrame {
        original_size,
        source_kind: plan.source.kind_name().to_string(),
        plan_json: serde_json::to_string(plan)?,
        streams,
    };
    frame.to_bytes()
}

//==================================================================================
// 2. Decompression
//==================================================================================

pub fn decompress(graph: &CompiledGraph, bytes: &[u8]) -> Result<Decompressed, tambakError> {
    let mut frame = GraphFrame::from_bytes(bytes)?;
    let plan = read_plan(&frame)?;

    let output = match plan.source {
        SourcePlan::Segments {
            nb_tags,
            nb_segments,
            source_size,
        } => {
            check_dispatch_tags(graph, nb_tags)?;
            let slots = decode_groups(graph, &plan.groups, &mut frame, nb_tags as usize)?;
            let channels: Vec<TaggedStream> = slots
                .into_iter()
                .map(|s| s.unwrap_or_else(|| TaggedStream::serial(Vec::new())))
                .collect();

            let count = to_usize(nb_segments)?;
            let tags = leb128::decode::<u32>(&frame.take_stream(DISPATCH_TAGS_STREAM)?, count)
                .map_err(as_corruption)?;
            let lengths =
                leb128::decode::<u32>(&frame.take_stream(DISPATCH_SIZES_STREAM)?, count)
                    .map_err(as_corruption)?;
            let partition = SegmentPartition::new(lengths, tags)?;
            let restored = restore_bytes(&channels, &partition)?;
            if restored.len() as u64 != source_size || source_size != frame.original_size {
                return Err(tambakError::Corruption(format!(
                    "Restored {} bytes, frame records {}",
                    restored.len(),
                    source_size
                )));
            }
            Decompressed::Bytes(restored)
        }
        SourcePlan::Elements {
            nb_tags,
            nb_elements,
        } => {
            check_dispatch_tags(graph, nb_tags)?;
            if nb_elements != frame.original_size {
                return Err(tambakError::Corruption(format!(
                    "Plan records {} elements, frame header {}",
                    nb_elements, frame.original_size
                )));
            }
            let slots = decode_groups(graph, &plan.groups, &mut frame, nb_tags as usize)?;
            let channels = slots
                .into_iter()
                .map(|s| match s {
                    Some(stream) => Ok(stream),
                    None => TaggedStream::strings(Vec::new(), Vec::new()),
                })
                .collect::<Result<Vec<_>, tambakError>>()?;

            let tags = leb128::decode::<u32>(
                &frame.take_stream(DISPATCH_TAGS_STREAM)?,
                to_usize(nb_elements)?,
            )
            .map_err(as_corruption)?;
            Decompressed::Elements(restore_elements(&channels, &tags)?)
        }
        SourcePlan::Streams { nb_streams } => {
            let nb_members: usize = plan.groups.iter().map(|g| g.members.len()).sum();
            if nb_members as u64 != nb_streams || nb_streams != frame.original_size {
                return Err(tambakError::Corruption(format!(
                    "Plan routes {} member(s) for {} stream(s)",
                    nb_members, nb_streams
                )));
            }
            let slots = decode_groups(graph, &plan.groups, &mut frame, nb_members)?;
            let streams = slots
                .into_iter()
                .enumerate()
                .map(|(i, s)| {
                    s.ok_or_else(|| {
                        tambakError::Corruption(format!("Stream {} is not in any group", i))
                    })
                })
                .collect::<Result<Vec<_>, tambakError>>()?;
            Decompressed::Streams(streams)
        }
    };

    if !frame.streams.is_empty() {
        let mut leftover: Vec<&String> = frame.streams.keys().collect();
        leftover.sort();
        return Err(tambakError::Corruption(format!(
            "Frame holds unreferenced streams: {:?}",
            leftover
        )));
    }
    Ok(output)
}

/// The frame's channel count must be the one this graph dispatches to.
fn check_dispatch_tags(graph: &CompiledGraph, nb_tags: u32) -> Result<(), tambakError> {
    let expected = graph.require_dispatcher()?.nb_tags();
    if nb_tags != expected {
        return Err(tambakError::Corruption(format!(
            "Frame was dispatched to {} channels, graph dispatches to {}",
            nb_tags, expected
        )));
    }
    Ok(())
}

fn read_plan(frame: &GraphFrame) -> Result<RoutingPlan, tambakError> {
    let plan: RoutingPlan = serde_json::from_str(&frame.plan_json)
        .map_err(|e| tambakError::Corruption(format!("Unreadable routing plan: {}", e)))?;
    if plan.plan_version != PLAN_VERSION {
        return Err(tambakError::FrameFormatError(format!(
            "Unsupported plan version: expected {}, got {}",
            PLAN_VERSION, plan.plan_version
        )));
    }
    if plan.source.kind_name() != frame.source_kind {
        return Err(tambakError::Corruption(format!(
            "Header says '{}' but plan describes '{}'",
            frame.source_kind,
            plan.source.kind_name()
        )));
    }
    Ok(plan)
}

/// Decodes every group and places each member at its recorded index.
fn decode_groups(
    graph: &CompiledGraph,
    groups: &[GroupPlan],
    frame: &mut GraphFrame,
    nb_slots: usize,
) -> Result<Vec<Option<TaggedStream>>, tambakError> {
    let registry = graph.registry();
    let mut slots: Vec<Option<TaggedStream>> = vec![None; nb_slots];

    for (group_idx, gp) in groups.iter().enumerate() {
        let successor = registry.successor(gp.successor_idx).ok_or_else(|| {
            tambakError::InvalidInput(format!(
                "Frame uses successor {} but the graph registers only {}",
                gp.successor_idx,
                registry.nb_successors()
            ))
        })?;
        if successor.name() != gp.successor {
            return Err(tambakError::InvalidInput(format!(
                "Frame was written with successor '{}' at index {}, graph has '{}'",
                gp.successor,
                gp.successor_idx,
                successor.name()
            )));
        }

        let type_width = TypeWidth {
            stream_type: gp.stream_type,
            width: gp.width,
        };
        let payload = frame.take_stream(&group_stream_name(group_idx))?;
        let merged = successor
            .decode(&payload, type_width)
            .map_err(|e| e.at_stage(&format!("successor {}", gp.successor_idx)))?;

        let parts = if gp.forwarded {
            if gp.members.len() != 1 {
                return Err(tambakError::Corruption(format!(
                    "Forwarded group {} lists {} members",
                    group_idx,
                    gp.members.len()
                )));
            }
            vec![merged]
        } else {
            let sizes_bytes = frame.take_stream(&group_sizes_stream_name(group_idx))?;
            let sizes = leb128::decode::<u64>(&sizes_bytes, gp.members.len())
                .map_err(as_corruption)?;
            let codec = registry.concat_codec(gp.concat_codec_idx).ok_or_else(|| {
                tambakError::InvalidInput(format!(
                    "Frame uses concat codec {} but the graph registers only {}",
                    gp.concat_codec_idx,
                    registry.nb_concat_codecs()
                ))
            })?;
            codec.split(&merged, &sizes)?
        };

        for (member, mut part) in gp.members.iter().zip(parts) {
            let expected = TypeWidth {
                stream_type: member.stream_type,
                width: member.width,
            };
            if part.type_width() != expected || part.num_elts() as u64 != member.num_elts {
                return Err(tambakError::Corruption(format!(
                    "Member {} decoded as {} x{}, plan records {} x{}",
                    member.stream_index,
                    part.type_width(),
                    part.num_elts(),
                    expected,
                    member.num_elts
                )));
            }
            if let Some(tag) = member.tag {
                part.set_tag(tag);
            }
            let slot = to_usize(member.stream_index)
                .ok()
                .and_then(|i| slots.get_mut(i))
                .ok_or_else(|| {
                    tambakError::Corruption(format!(
                        "Member index {} outside [0, {})",
                        member.stream_index, nb_slots
                    ))
                })?;
            if slot.replace(part).is_some() {
                return Err(tambakError::Corruption(format!(
                    "Stream {} appears in more than one group",
                    member.stream_index
                )));
            }
        }
    }
    Ok(slots)
}

fn to_usize(value: u64) -> Result<usize, tambakError> {
    usize::try_from(value)
        .map_err(|_| tambakError::Corruption(format!("Count {} does not fit in memory", value)))
}

fn as_corruption(e: tambakError) -> tambakError {
    tambakError::Corruption(e.to_string())
}
