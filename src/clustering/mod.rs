//! This module implements type-aware clustering: many tagged streams in, one
//! merged stream per resolved Cluster or TypeDefault out.
//!
//! Resolution and grouping live in [`engine`]; the merge procedures a config
//! entry can name live in [`concat`].

pub mod concat;
pub mod engine;

pub use concat::{NumericConcat, SerialConcat, StringConcat, StringInterleaveConcat, StructConcat};
pub use engine::{ClusteringEngine, GroupMember, RoutedGroup};
