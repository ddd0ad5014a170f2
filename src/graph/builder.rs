// In: src/graph/builder.rs

//! Graph assembly: turning a registry and a `GraphConfig` into an immutable,
//! shareable `CompiledGraph`.
//!
//! `GraphBuilder::build` is the only place configuration is validated. A graph
//! that fails here never exists; a graph that exists is never re-checked.

use std::fmt;
use std::sync::Arc;

use crate::clustering::ClusteringEngine;
use crate::config::GraphConfig;
use crate::dispatch::{SegmentPartition, StreamDispatcher};
use crate::error::tambakError;
use crate::graph::registry::CodecRegistry;
use crate::graph::resolve::{EntryId, Resolver};
use crate::graph::validation;
use crate::pipeline::orchestrator::{self, Decompressed};
use crate::traits::{ConcatCodec, Successor};
use crate::types::{StreamType, TaggedStream};

//==================================================================================
// 1. Compiled entries
//==================================================================================

/// One validated Cluster or TypeDefault, with its strategy objects bound.
#[derive(Clone)]
pub struct CompiledEntry {
    pub id: EntryId,
    pub stream_type: StreamType,
    pub width: Option<usize>,
    pub successor_idx: usize,
    pub concat_codec_idx: usize,
    pub successor: Arc<dyn Successor>,
    pub concat_codec: Arc<dyn ConcatCodec>,
}

impl fmt::Debug for CompiledEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledEntry")
            .field("id", &self.id)
            .field("stream_type", &self.stream_type)
            .field("width", &self.width)
            .field("successor", &self.successor.name())
            .field("concat_codec", &self.concat_codec.name())
            .finish()
    }
}

//==================================================================================
// 2. Builder
//==================================================================================

/// Assembles a `CompiledGraph` from an explicitly injected registry.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    registry: CodecRegistry,
    config: GraphConfig,
}

impl GraphBuilder {
    pub fn new(registry: CodecRegistry) -> Self {
        Self {
            registry,
            config: GraphConfig::default(),
        }
    }

    pub fn with_config(mut self, config: GraphConfig) -> Self {
        self.config = config;
        self
    }

    /// Validates the config against the registry and compiles it.
    ///
    /// Fails with a `Configuration` error naming the first offending entry and
    /// field, or with `InvalidInput` for an impossible dispatch tag count.
    pub fn build(self) -> Result<CompiledGraph, tambakError> {
        let GraphBuilder { registry, config } = self;
        let clustering = &config.clustering;

        validation::validate(clustering, registry.nb_successors(), registry.nb_concat_codecs())
            .and_then(|_| validation::validate_structure(clustering, &registry))
            .map_err(|e| {
                log::warn!("Rejected graph configuration: {}", e);
                e
            })?;

        let dispatcher = config.dispatch_tags.map(StreamDispatcher::new).transpose()?;

        let clusters = clustering.clusters.iter().enumerate().map(|(i, c)| {
            (EntryId::Cluster(i), c.stream_type, c.width, c.successor_idx, c.concat_codec_idx)
        });
        let defaults = clustering.type_defaults.iter().enumerate().map(|(i, d)| {
            (EntryId::TypeDefault(i), d.stream_type, d.width, d.successor_idx, d.concat_codec_idx)
        });

        let mut entries = Vec::with_capacity(clustering.clusters.len() + clustering.type_defaults.len());
        for (id, stream_type, width, successor_idx, concat_codec_idx) in clusters.chain(defaults) {
            // Both lookups succeed: indices were range-checked above.
            let successor = registry.successor(successor_idx).cloned().ok_or_else(|| {
                tambakError::InternalError(format!("{} lost successor {}", id, successor_idx))
            })?;
            let concat_codec = registry.concat_codec(concat_codec_idx).cloned().ok_or_else(|| {
                tambakError::InternalError(format!("{} lost concat codec {}", id, concat_codec_idx))
            })?;
            entries.push(CompiledEntry {
                id,
                stream_type,
                width,
                successor_idx,
                concat_codec_idx,
                successor,
                concat_codec,
            });
        }

        let resolver = Resolver::new(clustering);
        log::info!(
            "Compiled graph: {} clusters, {} type defaults, {} successors, dispatch tags {:?}",
            clustering.clusters.len(),
            clustering.type_defaults.len(),
            registry.nb_successors(),
            config.dispatch_tags
        );

        Ok(CompiledGraph {
            config,
            registry,
            dispatcher,
            entries,
            resolver,
        })
    }
}

//==================================================================================
// 3. Compiled graph
//==================================================================================

/// A validated, immutable routing graph.
///
/// All per-invocation state lives in the arguments and return values of its
/// methods, so one graph can serve many threads at once behind an `Arc`.
#[derive(Debug)]
pub struct CompiledGraph {
    config: GraphConfig,
    registry: CodecRegistry,
    dispatcher: Option<StreamDispatcher>,
    entries: Vec<CompiledEntry>,
    resolver: Resolver,
}

impl CompiledGraph {
    pub fn config(&self) -> &GraphConfig {
        &self.config
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> Option<&StreamDispatcher> {
        self.dispatcher.as_ref()
    }

    /// The dispatcher, or an `InvalidInput` error for graphs declared without one.
    pub(crate) fn require_dispatcher(&self) -> Result<&StreamDispatcher, tambakError> {
        self.dispatcher.as_ref().ok_or_else(|| {
            tambakError::InvalidInput("Graph was built without dispatch_tags".to_string())
        })
    }

    /// Entries in routing order: clusters in declaration order, then type defaults.
    pub fn entries(&self) -> &[CompiledEntry] {
        &self.entries
    }

    pub fn entry(&self, id: EntryId) -> Option<&CompiledEntry> {
        self.entry_position(id).and_then(|pos| self.entries.get(pos))
    }

    pub(crate) fn entry_position(&self, id: EntryId) -> Option<usize> {
        let nb_clusters = self.config.clustering.clusters.len();
        match id {
            EntryId::Cluster(i) if i < nb_clusters => Some(i),
            EntryId::TypeDefault(i) if i < self.config.clustering.type_defaults.len() => {
                Some(nb_clusters + i)
            }
            _ => None,
        }
    }

    pub(crate) fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn engine(&self) -> ClusteringEngine<'_> {
        ClusteringEngine::new(self)
    }

    //------------------------------------------------------------------------------
    // Execution
    //------------------------------------------------------------------------------

    /// Dispatches `source` along `partition`, then routes every non-empty
    /// channel (tagged with its channel index) through clustering.
    pub fn compress_segments(
        &self,
        source: &[u8],
        partition: &SegmentPartition,
    ) -> Result<Vec<u8>, tambakError> {
        orchestrator::compress_segments(self, source, partition)
    }

    /// Element variant of [`compress_segments`](Self::compress_segments).
    pub fn compress_elements(
        &self,
        source: &TaggedStream,
        tags: &[u32],
    ) -> Result<Vec<u8>, tambakError> {
        orchestrator::compress_elements(self, source, tags)
    }

    /// Routes ready-made tagged streams through clustering.
    pub fn compress_streams(&self, streams: Vec<TaggedStream>) -> Result<Vec<u8>, tambakError> {
        orchestrator::compress_streams(self, streams)
    }

    /// Restores exactly what was compressed. The graph must use the same
    /// registry layout as the one that wrote the frame.
    pub fn decompress(&self, bytes: &[u8]) -> Result<Decompressed, tambakError> {
        orchestrator::decompress(self, bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Cluster, ClusterConfig, TypeDefault};
    use crate::error::{ConfigEntry, ConfigField, ErrorKind};
    use crate::graph::registry::{NUMERIC_CONCAT, SERIAL_CONCAT};
    use crate::kernels::StoreSuccessor;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn two_successor_registry() -> CodecRegistry {
        let mut registry = CodecRegistry::with_standard_concat_codecs();
        registry.register_successor(StoreSuccessor);
        registry.register_successor(StoreSuccessor);
        registry
    }

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_compiled_graph_is_shareable() {
        assert_send_sync::<CompiledGraph>();
        assert_send_sync::<Arc<CompiledGraph>>();
    }

    #[test]
    fn test_out_of_range_successor_fails_construction() {
        let config = GraphConfig::new(
            ClusterConfig::new().with_cluster(Cluster::new(vec![5], StreamType::Numeric, 3, NUMERIC_CONCAT)),
        );
        let err = GraphBuilder::new(two_successor_registry())
            .with_config(config)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
        match err {
            tambakError::Configuration(cfg) => {
                assert_eq!(cfg.entry, ConfigEntry::Cluster(0));
                assert_eq!(cfg.field, ConfigField::SuccessorIdx);
            }
            other => panic!("Expected a configuration error, got {:?}", other),
        }
    }

    #[test]
    fn test_entries_follow_config_order() {
        let config = GraphConfig::new(
            ClusterConfig::new()
                .with_cluster(Cluster::new(vec![1], StreamType::Serial, 1, SERIAL_CONCAT))
                .with_type_default(TypeDefault::new(StreamType::Numeric, 0, NUMERIC_CONCAT)),
        );
        let graph = GraphBuilder::new(two_successor_registry())
            .with_config(config)
            .build()
            .unwrap();
        let ids: Vec<EntryId> = graph.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![EntryId::Cluster(0), EntryId::TypeDefault(0)]);
        assert_eq!(graph.entry(EntryId::TypeDefault(0)).unwrap().successor_idx, 0);
        assert!(graph.entry(EntryId::TypeDefault(1)).is_none());
        assert!(graph.dispatcher().is_none());
    }

    #[test]
    fn test_bad_dispatch_tag_count_fails_construction() {
        let config = GraphConfig::default().with_dispatch_tags(0);
        let err = GraphBuilder::new(two_successor_registry())
            .with_config(config)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_construction_fails_iff_an_index_is_out_of_range() {
        let mut rng = StdRng::seed_from_u64(17);
        let nb_successors = 2;
        let nb_codecs = 4;
        for _ in 0..300 {
            let mut config = ClusterConfig::new();
            let mut any_bad = false;
            for tag in 0..rng.random_range(0..4) {
                let s = rng.random_range(0..4usize);
                any_bad |= s >= nb_successors;
                config = config.with_cluster(Cluster::new(vec![tag], StreamType::Serial, s, SERIAL_CONCAT));
            }
            if rng.random_bool(0.5) {
                let c = if rng.random_bool(0.8) { NUMERIC_CONCAT } else { nb_codecs + 1 };
                any_bad |= c >= nb_codecs;
                config = config.with_type_default(TypeDefault::new(StreamType::Numeric, 0, c));
            }

            let result = GraphBuilder::new(two_successor_registry())
                .with_config(GraphConfig::new(config))
                .build();
            assert_eq!(result.is_err(), any_bad);
        }
    }
}
