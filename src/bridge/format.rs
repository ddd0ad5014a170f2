// In: src/bridge/format.rs

//! Public-facing result types of the bridge.

use crate::pipeline::RoutingPlan;

/// The result of `analyze_frame`: sizes and the routing plan of a frame,
/// obtained without decoding any payload.
#[derive(Debug, Clone)]
pub struct FrameStats {
    pub header_size: usize,
    pub data_size: usize,
    pub total_size: usize,
    /// `segments`, `elements` or `streams`.
    pub source_kind: String,
    pub original_size: u64,
    pub plan: RoutingPlan,
    /// (stream name, stored bytes), sorted by name.
    pub streams: Vec<(String, usize)>,
}

impl FrameStats {
    pub fn nb_groups(&self) -> usize {
        self.plan.groups.len()
    }
}
