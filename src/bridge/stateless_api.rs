// In: src/bridge/stateless_api.rs

use arrow::record_batch::RecordBatch;

use crate::bridge::arrow_impl;
use crate::bridge::format::FrameStats;
use crate::error::tambakError;
use crate::graph::CompiledGraph;
use crate::pipeline::{GraphFrame, RoutingPlan};
use crate::types::TaggedStream;

/// Converts every column of `batch` into a TaggedStream tagged with its
/// column index.
pub fn record_batch_to_tagged_streams(
    batch: &RecordBatch,
) -> Result<Vec<TaggedStream>, tambakError> {
    batch
        .columns()
        .iter()
        .enumerate()
        .map(|(column_idx, column)| {
            let tag = i32::try_from(column_idx).map_err(|_| {
                tambakError::InvalidInput(format!("Column index {} exceeds tag range", column_idx))
            })?;
            let stream = arrow_impl::array_to_tagged_stream(column.as_ref())
                .map_err(|e| e.at_stage(&format!("column {}", column_idx)))?;
            Ok(stream.with_tag(tag))
        })
        .collect()
}

/// Routes the columns of `batch` through `graph` and returns the frame.
pub fn compress_record_batch(
    graph: &CompiledGraph,
    batch: &RecordBatch,
) -> Result<Vec<u8>, tambakError> {
    let streams = record_batch_to_tagged_streams(batch)?;
    log::debug!(
        "Routing record batch: {} column(s), {} row(s)",
        streams.len(),
        batch.num_rows()
    );
    graph.compress_streams(streams)
}

/// Inspects a frame without decoding any payload.
pub fn analyze_frame(bytes: &[u8]) -> Result<FrameStats, tambakError> {
    let info = GraphFrame::peek_info(bytes)?;
    let plan: RoutingPlan = serde_json::from_str(&info.plan_json)
        .map_err(|e| tambakError::Corruption(format!("Unreadable routing plan: {}", e)))?;

    Ok(FrameStats {
        header_size: info.header_size,
        data_size: info.data_size,
        total_size: bytes.len(),
        source_kind: info.source_kind,
        original_size: info.original_size,
        plan,
        streams: info.stream_metadata,
    })
}
