//! Build-time checks on a `ClusterConfig`.
//!
//! Everything here runs once, while a graph is assembled, and never touches
//! data. A config that passes can still fail at execution only for reasons
//! that depend on the data itself (an unresolved stream, or members of a
//! width-agnostic entry with differing widths).
//!
//! Entries are checked in a fixed order (clusters first, then type defaults,
//! each in declaration order) so the same bad config always reports the same
//! error.

use hashbrown::{HashMap, HashSet};

use crate::config::{Cluster, ClusterConfig, TypeDefault};
use crate::error::{ConfigEntry, ConfigError, ConfigField};
use crate::graph::registry::CodecRegistry;
use crate::types::StreamType;

/// Checks that every successor and concat-codec index is in range.
pub fn validate(
    config: &ClusterConfig,
    nb_successors: usize,
    nb_concat_codecs: usize,
) -> Result<(), ConfigError> {
    let entries = config
        .clusters
        .iter()
        .enumerate()
        .map(|(i, c)| (ConfigEntry::Cluster(i), c.successor_idx, c.concat_codec_idx))
        .chain(
            config
                .type_defaults
                .iter()
                .enumerate()
                .map(|(i, d)| (ConfigEntry::TypeDefault(i), d.successor_idx, d.concat_codec_idx)),
        );

    for (entry, successor_idx, concat_codec_idx) in entries {
        if successor_idx >= nb_successors {
            return Err(ConfigError::new(
                entry,
                ConfigField::SuccessorIdx,
                format!(
                    "{} has invalid successor_idx {} ({} successors registered)",
                    entry, successor_idx, nb_successors
                ),
            ));
        }
        if concat_codec_idx >= nb_concat_codecs {
            return Err(ConfigError::new(
                entry,
                ConfigField::ConcatCodecIdx,
                format!(
                    "{} has invalid concat_codec_idx {} ({} concat codecs registered)",
                    entry, concat_codec_idx, nb_concat_codecs
                ),
            ));
        }
    }
    Ok(())
}

/// Checks everything about the config that is knowable without data, beyond
/// index ranges. Assumes [`validate`] has already passed.
pub fn validate_structure(
    config: &ClusterConfig,
    registry: &CodecRegistry,
) -> Result<(), ConfigError> {
    for (i, cluster) in config.clusters.iter().enumerate() {
        let entry = ConfigEntry::Cluster(i);
        check_width(entry, cluster.stream_type, cluster.width)?;
        check_codec_kind(entry, cluster.stream_type, cluster.concat_codec_idx, registry)?;
        check_member_tags(entry, cluster)?;
    }
    check_cluster_overlap(&config.clusters)?;

    let mut seen: HashMap<(StreamType, Option<usize>), usize> = HashMap::new();
    for (i, default) in config.type_defaults.iter().enumerate() {
        let entry = ConfigEntry::TypeDefault(i);
        check_width(entry, default.stream_type, default.width)?;
        check_codec_kind(entry, default.stream_type, default.concat_codec_idx, registry)?;
        check_duplicate_default(i, default, &mut seen)?;
    }
    Ok(())
}

fn check_width(
    entry: ConfigEntry,
    stream_type: StreamType,
    width: Option<usize>,
) -> Result<(), ConfigError> {
    match width {
        Some(w) => stream_type
            .check_width(w)
            .map_err(|msg| ConfigError::new(entry, ConfigField::Width, format!("{}: {}", entry, msg))),
        None => Ok(()),
    }
}

fn check_codec_kind(
    entry: ConfigEntry,
    stream_type: StreamType,
    concat_codec_idx: usize,
    registry: &CodecRegistry,
) -> Result<(), ConfigError> {
    let codec = registry.concat_codec(concat_codec_idx).ok_or_else(|| {
        ConfigError::new(
            entry,
            ConfigField::ConcatCodecIdx,
            format!("{} has invalid concat_codec_idx {}", entry, concat_codec_idx),
        )
    })?;
    if !codec.accepts(stream_type) {
        return Err(ConfigError::new(
            entry,
            ConfigField::ConcatCodecIdx,
            format!(
                "{} routes {} streams through concat codec '{}', which cannot merge them",
                entry,
                stream_type,
                codec.name()
            ),
        ));
    }
    Ok(())
}

fn check_member_tags(entry: ConfigEntry, cluster: &Cluster) -> Result<(), ConfigError> {
    if cluster.member_tags.is_empty() {
        return Err(ConfigError::new(
            entry,
            ConfigField::MemberTags,
            format!("{} has no member tags", entry),
        ));
    }
    let mut seen = HashSet::with_capacity(cluster.member_tags.len());
    for &tag in &cluster.member_tags {
        if !seen.insert(tag) {
            return Err(ConfigError::new(
                entry,
                ConfigField::MemberTags,
                format!("{} lists tag {} more than once", entry, tag),
            ));
        }
    }
    Ok(())
}

/// Two clusters may claim the same tag only if their types differ, or their
/// declared widths are both set and different.
fn check_cluster_overlap(clusters: &[Cluster]) -> Result<(), ConfigError> {
    let mut claims: HashMap<(StreamType, i32), Vec<(usize, Option<usize>)>> = HashMap::new();
    for (i, cluster) in clusters.iter().enumerate() {
        for &tag in &cluster.member_tags {
            let owners = claims.entry((cluster.stream_type, tag)).or_default();
            if let Some(&(prev, _)) = owners
                .iter()
                .find(|(_, w)| widths_overlap(*w, cluster.width))
            {
                let entry = ConfigEntry::Cluster(i);
                return Err(ConfigError::new(
                    entry,
                    ConfigField::MemberTags,
                    format!(
                        "{} claims tag {} for {} streams, already claimed by Cluster {}",
                        entry, tag, cluster.stream_type, prev
                    ),
                ));
            }
            owners.push((i, cluster.width));
        }
    }
    Ok(())
}

fn check_duplicate_default(
    index: usize,
    default: &TypeDefault,
    seen: &mut HashMap<(StreamType, Option<usize>), usize>,
) -> Result<(), ConfigError> {
    if let Some(prev) = seen.insert((default.stream_type, default.width), index) {
        let entry = ConfigEntry::TypeDefault(index);
        let field = match default.width {
            Some(_) => ConfigField::Width,
            None => ConfigField::StreamType,
        };
        return Err(ConfigError::new(
            entry,
            field,
            format!(
                "{} duplicates TypeDefault {} for {} (width {:?})",
                entry, prev, default.stream_type, default.width
            ),
        ));
    }
    Ok(())
}

fn widths_overlap(a: Option<usize>, b: Option<usize>) -> bool {
    match (a, b) {
        (Some(x), Some(y)) => x == y,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::registry::{NUMERIC_CONCAT, SERIAL_CONCAT, STRING_CONCAT};

    fn registry() -> CodecRegistry {
        CodecRegistry::with_standard_concat_codecs()
    }

    #[test]
    fn test_out_of_range_successor_names_entry_and_field() {
        let config = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![5], StreamType::Numeric, 0, NUMERIC_CONCAT))
            .with_cluster(Cluster::new(vec![6], StreamType::Numeric, 3, NUMERIC_CONCAT));
        let err = validate(&config, 2, 4).unwrap_err();
        assert_eq!(err.entry, ConfigEntry::Cluster(1));
        assert_eq!(err.field, ConfigField::SuccessorIdx);
        assert_eq!(err.path, "/clusters/1/successor_idx");
    }

    #[test]
    fn test_out_of_range_codec_on_default() {
        let config = ClusterConfig::new().with_type_default(TypeDefault::new(StreamType::Serial, 0, 9));
        let err = validate(&config, 1, 4).unwrap_err();
        assert_eq!(err.entry, ConfigEntry::TypeDefault(0));
        assert_eq!(err.field, ConfigField::ConcatCodecIdx);
    }

    #[test]
    fn test_first_bad_entry_is_reported() {
        // Both entries are bad; the cluster is checked before the default.
        let config = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![1], StreamType::Serial, 7, SERIAL_CONCAT))
            .with_type_default(TypeDefault::new(StreamType::Serial, 8, SERIAL_CONCAT));
        for _ in 0..3 {
            let err = validate(&config, 2, 4).unwrap_err();
            assert_eq!(err.entry, ConfigEntry::Cluster(0));
        }
    }

    #[test]
    fn test_empty_config_is_valid() {
        assert!(validate(&ClusterConfig::new(), 0, 0).is_ok());
        assert!(validate_structure(&ClusterConfig::new(), &registry()).is_ok());
    }

    #[test]
    fn test_static_width_errors() {
        let config = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![1], StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(3));
        let err = validate_structure(&config, &registry()).unwrap_err();
        assert_eq!(err.field, ConfigField::Width);

        let config = ClusterConfig::new()
            .with_type_default(TypeDefault::new(StreamType::String, 0, STRING_CONCAT).with_width(4));
        let err = validate_structure(&config, &registry()).unwrap_err();
        assert_eq!(err.entry, ConfigEntry::TypeDefault(0));
        assert_eq!(err.field, ConfigField::Width);
    }

    #[test]
    fn test_codec_kind_must_accept_type() {
        let config = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![1], StreamType::String, 0, NUMERIC_CONCAT));
        let err = validate_structure(&config, &registry()).unwrap_err();
        assert_eq!(err.field, ConfigField::ConcatCodecIdx);
        assert!(err.message.contains("numeric"));
    }

    #[test]
    fn test_member_tag_rules() {
        let empty = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![], StreamType::Serial, 0, SERIAL_CONCAT));
        assert_eq!(
            validate_structure(&empty, &registry()).unwrap_err().field,
            ConfigField::MemberTags
        );

        let repeated = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![2, 2], StreamType::Serial, 0, SERIAL_CONCAT));
        assert!(validate_structure(&repeated, &registry()).is_err());

        let overlapping = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![1, 2], StreamType::Numeric, 0, NUMERIC_CONCAT))
            .with_cluster(Cluster::new(vec![2], StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(4));
        let err = validate_structure(&overlapping, &registry()).unwrap_err();
        assert_eq!(err.entry, ConfigEntry::Cluster(1));

        // Same tag, different types or disjoint widths: fine.
        let disjoint = ClusterConfig::new()
            .with_cluster(Cluster::new(vec![2], StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(2))
            .with_cluster(Cluster::new(vec![2], StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(4))
            .with_cluster(Cluster::new(vec![2], StreamType::String, 0, STRING_CONCAT));
        assert!(validate_structure(&disjoint, &registry()).is_ok());
    }

    #[test]
    fn test_duplicate_defaults_are_rejected() {
        let config = ClusterConfig::new()
            .with_type_default(TypeDefault::new(StreamType::Numeric, 0, NUMERIC_CONCAT))
            .with_type_default(TypeDefault::new(StreamType::Numeric, 0, NUMERIC_CONCAT).with_width(4))
            .with_type_default(TypeDefault::new(StreamType::Numeric, 1, NUMERIC_CONCAT));
        let err = validate_structure(&config, &registry()).unwrap_err();
        assert_eq!(err.entry, ConfigEntry::TypeDefault(2));
        assert_eq!(err.field, ConfigField::StreamType);
    }
}
