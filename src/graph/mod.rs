//! This module owns graph construction: the injected codec registry, the
//! build-time validation of a `ClusterConfig`, the per-stream resolution
//! tables and the compiled, shareable graph itself.

pub mod builder;
pub mod registry;
pub mod resolve;
pub mod validation;

pub use builder::{CompiledEntry, CompiledGraph, GraphBuilder};
pub use registry::{CodecRegistry, NUMERIC_CONCAT, SERIAL_CONCAT, STRING_CONCAT, STRUCT_CONCAT};
pub use resolve::{EntryId, Resolver};
pub use validation::validate;
