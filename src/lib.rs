//! This file is the root of the `tambak_graph` Rust crate.
//!
//! The crate is the routing substrate of a graph compressor: it cuts a buffer
//! into per-tag channels (`dispatch`), groups typed streams by tag and type
//! into clusters (`clustering`), and hands each merged group to a successor
//! codec, all driven by a validated, immutable `CompiledGraph` (`graph`).
//!
//! Its responsibilities here are limited to declaring the modules and
//! re-exporting the types most callers need.

//==================================================================================
// 0. Constants
//==================================================================================
/// The crate version, automatically set from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
//==================================================================================
// 1. Module Declarations
//==================================================================================
#[macro_use]
mod observability; // Make macros available throughout the crate

pub mod bridge;
pub mod clustering;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod graph;
pub mod kernels;
pub mod logging;
pub mod pipeline;
pub mod traits;
pub mod types;

//==================================================================================
// 2. Public Surface
//==================================================================================
pub use clustering::ClusteringEngine;
pub use config::{Cluster, ClusterConfig, GraphConfig, TypeDefault};
pub use dispatch::{SegmentPartition, StreamDispatcher};
pub use error::{tambakError, ConfigError, ErrorKind};
pub use graph::{CodecRegistry, CompiledGraph, EntryId, GraphBuilder};
pub use logging::enable_verbose_logging;
pub use pipeline::Decompressed;
pub use traits::{ConcatCodec, Successor};
pub use types::{StreamType, TaggedStream, TypeWidth};
