// In: src/config.rs

//! The single source of truth for graph routing configuration.
//!
//! A `GraphConfig` is created once at the application boundary (e.g. from a
//! JSON document), handed to the `GraphBuilder`, validated there exactly once,
//! and then owned read-only by the compiled graph for every later invocation.
//!
//! Successor and concat-codec references are plain indices into the lists held
//! by the `CodecRegistry` the graph is built against.

use serde::{Deserialize, Serialize};

use crate::error::tambakError;
use crate::types::StreamType;

//==================================================================================
// I. Routing Entries
//==================================================================================

/// An explicit cluster: streams whose tag is in `member_tags` (and whose type
/// matches) are merged and sent to `successor_idx`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Cluster {
    pub member_tags: Vec<i32>,
    pub stream_type: StreamType,
    /// Element width the members must have. `None` accepts any width, checked
    /// for uniformity when the group is concatenated.
    #[serde(default)]
    pub width: Option<usize>,
    pub successor_idx: usize,
    pub concat_codec_idx: usize,
}

impl Cluster {
    pub fn new(
        member_tags: Vec<i32>,
        stream_type: StreamType,
        successor_idx: usize,
        concat_codec_idx: usize,
    ) -> Self {
        Self {
            member_tags,
            stream_type,
            width: None,
            successor_idx,
            concat_codec_idx,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

/// Fallback routing for a stream type when no cluster claims a stream's tag.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TypeDefault {
    pub stream_type: StreamType,
    /// `Some(w)` applies only to width `w` and is preferred over a
    /// width-agnostic (`None`) default for the same type.
    #[serde(default)]
    pub width: Option<usize>,
    pub successor_idx: usize,
    pub concat_codec_idx: usize,
}

impl TypeDefault {
    pub fn new(stream_type: StreamType, successor_idx: usize, concat_codec_idx: usize) -> Self {
        Self {
            stream_type,
            width: None,
            successor_idx,
            concat_codec_idx,
        }
    }

    pub fn with_width(mut self, width: usize) -> Self {
        self.width = Some(width);
        self
    }
}

/// The declared clustering policy: explicit clusters plus per-type defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ClusterConfig {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub type_defaults: Vec<TypeDefault>,
}

impl ClusterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cluster(mut self, cluster: Cluster) -> Self {
        self.clusters.push(cluster);
        self
    }

    pub fn with_type_default(mut self, default: TypeDefault) -> Self {
        self.type_defaults.push(default);
        self
    }
}

//==================================================================================
// II. The Unified GraphConfig
//==================================================================================

/// Everything a `GraphBuilder` needs besides the registry.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct GraphConfig {
    /// Number of dispatch channels, for graphs that start from a raw buffer
    /// and a segment partition. `None` for graphs fed with ready-made streams.
    #[serde(default)]
    pub dispatch_tags: Option<u32>,

    #[serde(default)]
    pub clustering: ClusterConfig,

    /// If true, per-group sizes are logged at `info` level on every compression.
    #[serde(default)]
    pub enable_stats_collection: bool,
}

impl GraphConfig {
    pub fn new(clustering: ClusterConfig) -> Self {
        Self {
            clustering,
            ..Self::default()
        }
    }

    pub fn with_dispatch_tags(mut self, nb_tags: u32) -> Self {
        self.dispatch_tags = Some(nb_tags);
        self
    }

    pub fn from_json(json: &str) -> Result<Self, tambakError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, tambakError> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_fills_defaults() {
        let json = r#"{
            "clustering": {
                "clusters": [
                    { "member_tags": [5], "stream_type": "numeric",
                      "successor_idx": 0, "concat_codec_idx": 2 }
                ],
                "type_defaults": [
                    { "stream_type": "numeric", "width": 4,
                      "successor_idx": 1, "concat_codec_idx": 2 }
                ]
            }
        }"#;
        let config = GraphConfig::from_json(json).unwrap();
        assert_eq!(config.dispatch_tags, None);
        assert!(!config.enable_stats_collection);
        assert_eq!(config.clustering.clusters[0].width, None);
        assert_eq!(config.clustering.clusters[0].member_tags, vec![5]);
        assert_eq!(config.clustering.type_defaults[0].width, Some(4));
    }

    #[test]
    fn test_builders_match_json_form() {
        let built = GraphConfig::new(
            ClusterConfig::new()
                .with_cluster(Cluster::new(vec![1, 2], StreamType::String, 0, 3))
                .with_type_default(TypeDefault::new(StreamType::Serial, 1, 0)),
        )
        .with_dispatch_tags(4);
        let back = GraphConfig::from_json(&built.to_json().unwrap()).unwrap();
        assert_eq!(back, built);
    }

    #[test]
    fn test_negative_index_is_rejected_by_parser() {
        let json = r#"{ "clustering": { "type_defaults": [
            { "stream_type": "serial", "successor_idx": -1, "concat_codec_idx": 0 }
        ] } }"#;
        assert!(matches!(
            GraphConfig::from_json(json),
            Err(tambakError::SerdeJson(_))
        ));
    }
}
