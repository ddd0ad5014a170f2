//! Resolution of a stream to the configured entry that will carry it.
//!
//! The lookup tables are built once per compiled graph from the validated
//! config; resolving a stream is then a couple of hash lookups.

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::ClusterConfig;
use crate::types::{StreamType, TypeWidth};

/// Identity of a configured routing entry: its position in the config.
///
/// Streams are grouped by this identity, so two entries that share a successor
/// still produce separate groups.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", content = "index", rename_all = "snake_case")]
pub enum EntryId {
    Cluster(usize),
    TypeDefault(usize),
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::Cluster(i) => write!(f, "Cluster {}", i),
            EntryId::TypeDefault(i) => write!(f, "TypeDefault {}", i),
        }
    }
}

#[derive(Debug, Default, Clone)]
struct DefaultsForType {
    exact: HashMap<usize, usize>,
    any_width: Option<usize>,
}

/// Precomputed lookup tables over a `ClusterConfig`.
#[derive(Debug, Default, Clone)]
pub struct Resolver {
    /// (type, tag) -> clusters claiming it, as (cluster index, declared width).
    claims: HashMap<(StreamType, i32), Vec<(usize, Option<usize>)>>,
    defaults: HashMap<StreamType, DefaultsForType>,
}

impl Resolver {
    pub fn new(config: &ClusterConfig) -> Self {
        let mut claims: HashMap<(StreamType, i32), Vec<(usize, Option<usize>)>> = HashMap::new();
        for (i, cluster) in config.clusters.iter().enumerate() {
            for &tag in &cluster.member_tags {
                claims
                    .entry((cluster.stream_type, tag))
                    .or_default()
                    .push((i, cluster.width));
            }
        }

        let mut defaults: HashMap<StreamType, DefaultsForType> = HashMap::new();
        for (i, default) in config.type_defaults.iter().enumerate() {
            let slot = defaults.entry(default.stream_type).or_default();
            match default.width {
                Some(w) => {
                    slot.exact.entry(w).or_insert(i);
                }
                None => {
                    slot.any_width.get_or_insert(i);
                }
            }
        }

        Self { claims, defaults }
    }

    /// Explicit cluster membership first, then the exact-width type default,
    /// then the width-agnostic one. Untagged streams skip the cluster scan.
    pub fn resolve(&self, tag: Option<i32>, type_width: TypeWidth) -> Option<EntryId> {
        if let Some(tag) = tag {
            let claimed = self
                .claims
                .get(&(type_width.stream_type, tag))
                .and_then(|owners| {
                    owners
                        .iter()
                        .find(|(_, w)| w.map_or(true, |w| w == type_width.width))
                });
            if let Some(&(cluster_idx, _)) = claimed {
                return Some(EntryId::Cluster(cluster_idx));
            }
        }

        let defaults = self.defaults.get(&type_width.stream_type)?;
        defaults
            .exact
            .get(&type_width.width)
            .copied()
            .or(defaults.any_width)
            .map(EntryId::TypeDefault)
    }
}
