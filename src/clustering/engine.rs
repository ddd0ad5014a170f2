//! The clustering engine: resolve, group, concatenate, forward.

use crate::error::tambakError;
use crate::graph::{CompiledEntry, CompiledGraph, EntryId};
use crate::types::{TaggedStream, TypeWidth};

/// Where one input stream went.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMember {
    /// Position of the stream in the routed input.
    pub stream_index: usize,
    pub tag: Option<i32>,
    pub type_width: TypeWidth,
    pub num_elts: u64,
}

/// One output of clustering: the merged stream for one resolved entry.
#[derive(Debug, Clone)]
pub struct RoutedGroup {
    pub entry: EntryId,
    pub successor_idx: usize,
    pub concat_codec_idx: usize,
    /// Members in input order.
    pub members: Vec<GroupMember>,
    pub stream: TaggedStream,
    /// Per-member element counts, or `None` when the single member was
    /// forwarded as-is without running the concat codec.
    pub member_sizes: Option<Vec<u64>>,
}

impl RoutedGroup {
    pub fn is_forwarded(&self) -> bool {
        self.member_sizes.is_none()
    }
}

/// Routes tagged streams through a compiled graph's clusters and defaults.
///
/// The engine borrows the graph and holds no state of its own, so any number
/// of engines may run against one graph concurrently.
#[derive(Debug, Clone, Copy)]
pub struct ClusteringEngine<'g> {
    graph: &'g CompiledGraph,
}

impl<'g> ClusteringEngine<'g> {
    pub fn new(graph: &'g CompiledGraph) -> Self {
        Self { graph }
    }

    /// Resolves every stream to an entry. The first stream that matches
    /// nothing aborts the whole call.
    pub fn resolve_all(&self, streams: &[TaggedStream]) -> Result<Vec<EntryId>, tambakError> {
        streams
            .iter()
            .enumerate()
            .map(|(i, stream)| {
                self.graph
                    .resolver()
                    .resolve(stream.tag(), stream.type_width())
                    .ok_or_else(|| {
                        tambakError::InvalidInput(format!(
                            "Stream {} (tag {}, {}) matches no cluster and no type default",
                            i,
                            stream
                                .tag()
                                .map_or_else(|| "none".to_string(), |t| t.to_string()),
                            stream.type_width()
                        ))
                    })
            })
            .collect()
    }

    /// Groups streams by resolved entry and merges each group.
    ///
    /// Groups come out in entry order (clusters, then type defaults); entries
    /// no stream resolved to produce nothing.
    pub fn route(&self, streams: Vec<TaggedStream>) -> Result<Vec<RoutedGroup>, tambakError> {
        let assignments = self.resolve_all(&streams)?;

        let mut buckets: Vec<Vec<usize>> = vec![Vec::new(); self.graph.entries().len()];
        for (stream_index, id) in assignments.iter().enumerate() {
            let pos = self.graph.entry_position(*id).ok_or_else(|| {
                tambakError::InternalError(format!("Resolved to unknown entry {}", id))
            })?;
            buckets[pos].push(stream_index);
        }

        let mut slots: Vec<Option<TaggedStream>> = streams.into_iter().map(Some).collect();
        let mut groups = Vec::new();
        for (entry, member_indices) in self.graph.entries().iter().zip(buckets) {
            if member_indices.is_empty() {
                continue;
            }
            groups.push(self.build_group(entry, &member_indices, &mut slots)?);
        }
        Ok(groups)
    }

    fn build_group(
        &self,
        entry: &CompiledEntry,
        member_indices: &[usize],
        slots: &mut [Option<TaggedStream>],
    ) -> Result<RoutedGroup, tambakError> {
        let members: Vec<TaggedStream> = member_indices
            .iter()
            .map(|&i| {
                slots[i].take().ok_or_else(|| {
                    tambakError::InternalError(format!("Stream {} routed twice", i))
                })
            })
            .collect::<Result<_, _>>()?;

        let member_info: Vec<GroupMember> = member_indices
            .iter()
            .zip(members.iter())
            .map(|(&stream_index, s)| GroupMember {
                stream_index,
                tag: s.tag(),
                type_width: s.type_width(),
                num_elts: s.num_elts() as u64,
            })
            .collect();

        let (stream, member_sizes) = if members.len() == 1 {
            let mut members = members;
            (members.remove(0), None)
        } else {
            let refs: Vec<&TaggedStream> = members.iter().collect();
            let out = entry
                .concat_codec
                .concat(&refs)
                .map_err(|e| e.at_stage(&format!("concat ({})", entry.id)))?;
            (out.merged, Some(out.member_sizes))
        };

        log_metric!(
            "event" = "route_group",
            "entry" = &entry.id,
            "successor" = entry.successor.name(),
            "members" = &member_info.len(),
            "forwarded" = &member_sizes.is_none()
        );

        Ok(RoutedGroup {
            entry: entry.id,
            successor_idx: entry.successor_idx,
            concat_codec_idx: entry.concat_codec_idx,
            members: member_info,
            stream,
            member_sizes,
        })
    }

    /// Hands a group's merged stream to its successor.
    pub fn forward(&self, group: &RoutedGroup) -> Result<Vec<u8>, tambakError> {
        let entry = self.graph.entry(group.entry).ok_or_else(|| {
            tambakError::InternalError(format!("Group refers to unknown entry {}", group.entry))
        })?;
        entry.successor.encode(&group.stream)
    }
}
