// In: src/bridge/mod.rs

// ====================================================================================
// ARCHITECTURAL OVERVIEW: The Bridge Layer
// ====================================================================================
//
// The `bridge` connects columnar Arrow data to the Arrow-agnostic routing engine.
// Each column of a RecordBatch becomes one TaggedStream whose clustering tag is the
// column index, so a ClusterConfig can group columns by position.
//
// Data Flow (Compression):
//
//   1. [Stateless API (compress_record_batch)]   -> Receives `&RecordBatch`
//         |
//         `-> a. Calls `arrow_impl` to convert each column -> `TaggedStream`
//         |
//         `-> b. Calls `CompiledGraph::compress_streams`
//
//   2. [Pipeline (pipeline::orchestrator)]       -> Returns a serialized graph frame
//
// Inspection:
//
//   [Stateless API (analyze_frame)] -> `GraphFrame::peek_info` -> `FrameStats`
//
// ====================================================================================
pub(crate) mod arrow_impl;
pub(crate) mod format;
pub mod stateless_api;

pub use format::FrameStats;
pub use stateless_api::{analyze_frame, compress_record_batch, record_batch_to_tagged_streams};

#[cfg(test)]
mod tests;
